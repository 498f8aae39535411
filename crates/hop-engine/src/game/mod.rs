pub mod coin;
pub mod contact;
pub mod driver;
pub mod layout;
pub mod level;
pub mod piston;
pub mod player;
