use std::collections::HashMap;

use super::frame::{LIT_PROGRAM, MORPH_PROGRAM};
use super::traits::{ProgramId, Renderer};

/// Flat magenta program substituted for anything that fails to compile.
pub const ERROR_VERTEX: &str = "#version 450 core
layout(location = 0) in vec3 position;
uniform mat4 matrix;
uniform mat4 model;
void main()
{
    gl_Position = matrix * model * vec4(position, 1.0);
}
";

pub const ERROR_FRAGMENT: &str = "#version 450 core
out vec4 color;
void main()
{
    color = vec4(1.0, 0.0, 1.0, 1.0);
}
";

/// Lit surface. Shared by both built-in programs.
pub const LIT_FRAGMENT: &str = "#version 450 core
struct PointLight { vec3 position; vec3 color; float radius; };
uniform vec4 baseColor;
uniform vec3 eye;
uniform vec3 ambient;
uniform vec3 sunPos;
uniform vec3 sunColor;
uniform int lightCount;
uniform PointLight lights[16];
in vec3 worldPos;
in vec3 worldNormal;
out vec4 color;
void main()
{
    vec3 n = normalize(worldNormal);
    vec3 lit = ambient + sunColor * max(dot(n, normalize(sunPos - worldPos)), 0.0);
    for (int i = 0; i < lightCount; i++)
    {
        vec3 d = lights[i].position - worldPos;
        float falloff = clamp(1.0 - length(d) / lights[i].radius, 0.0, 1.0);
        lit += lights[i].color * falloff * max(dot(n, normalize(d)), 0.0);
    }
    color = vec4(baseColor.rgb * lit, baseColor.a);
}
";

pub const LIT_VERTEX: &str = "#version 450 core
layout(location = 0) in vec3 position;
layout(location = 1) in vec3 normal;
layout(location = 2) in vec2 uv;
uniform mat4 matrix;
uniform mat4 model;
out vec3 worldPos;
out vec3 worldNormal;
void main()
{
    vec4 world = model * vec4(position, 1.0);
    worldPos = world.xyz;
    worldNormal = mat3(model) * normal;
    gl_Position = matrix * world;
}
";

/// Second vertex stream (locations 3..5) is the morph target.
pub const MORPH_VERTEX: &str = "#version 450 core
layout(location = 0) in vec3 position;
layout(location = 1) in vec3 normal;
layout(location = 2) in vec2 uv;
layout(location = 3) in vec3 targetPosition;
layout(location = 4) in vec3 targetNormal;
layout(location = 5) in vec2 targetUv;
uniform mat4 matrix;
uniform mat4 model;
uniform float animFac;
out vec3 worldPos;
out vec3 worldNormal;
void main()
{
    vec4 world = model * vec4(mix(position, targetPosition, animFac), 1.0);
    worldPos = world.xyz;
    worldNormal = mat3(model) * mix(normal, targetNormal, animFac);
    gl_Position = matrix * world;
}
";

/// Named shader programs with a visible fallback.
///
/// A program that fails to compile is logged and replaced by the error
/// program, so rendering continues in a visibly wrong but stable state.
#[derive(Debug)]
pub struct ShaderLibrary {
    programs: HashMap<String, ProgramId>,
    fallback: ProgramId,
}

impl ShaderLibrary {
    pub const ERROR_PROGRAM: &'static str = "error";

    /// Compile the error program. If even that fails, program 0 is used.
    pub fn new(renderer: &mut dyn Renderer) -> Self {
        let fallback = match renderer.compile_program(Self::ERROR_PROGRAM, ERROR_VERTEX, ERROR_FRAGMENT) {
            Ok(program) => program,
            Err(log) => {
                log::error!("error shader failed to compile, drawing with no program: {log}");
                ProgramId::default()
            }
        };
        Self {
            programs: HashMap::new(),
            fallback,
        }
    }

    /// Error program plus the lit and morph programs the draw list binds.
    pub fn builtin(renderer: &mut dyn Renderer) -> Self {
        let mut library = Self::new(renderer);
        library.load(renderer, LIT_PROGRAM, LIT_VERTEX, LIT_FRAGMENT);
        library.load(renderer, MORPH_PROGRAM, MORPH_VERTEX, LIT_FRAGMENT);
        library
    }

    /// Compile and register `name`. Always yields a usable program id.
    pub fn load(&mut self, renderer: &mut dyn Renderer, name: &str, vertex_src: &str, fragment_src: &str) -> ProgramId {
        let program = match renderer.compile_program(name, vertex_src, fragment_src) {
            Ok(program) => program,
            Err(log) => {
                log::warn!("shader '{name}' failed to compile, using fallback: {log}");
                self.fallback
            }
        };
        self.programs.insert(name.to_string(), program);
        program
    }

    /// Program registered as `name`, or the fallback.
    pub fn get(&self, name: &str) -> ProgramId {
        self.programs.get(name).copied().unwrap_or(self.fallback)
    }

    pub fn bind(&self, renderer: &mut dyn Renderer, name: &str) -> ProgramId {
        let program = self.get(name);
        renderer.bind_program(program);
        program
    }

    pub fn fallback(&self) -> ProgramId {
        self.fallback
    }

    pub fn is_fallback(&self, name: &str) -> bool {
        self.get(name) == self.fallback
    }
}
