/// Built-in lit shader: Phong lighting from one point light, diffuse and
/// specular maps modulated by vertex color.
///
/// Custom programs must keep the same bind groups: group 0 binding 0 is the
/// per-draw uniform block, group 1 holds the diffuse texture (0), the
/// specular texture (1) and a sampler (2). Entry points are `vs_main` and
/// `fs_main`.
pub const CORE_SHADER: &str = r#"
struct Uniforms {
    model: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    camera_pos: vec4<f32>,
    light_pos: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> u: Uniforms;

@group(1) @binding(0)
var diffuse_tex: texture_2d<f32>;
@group(1) @binding(1)
var specular_tex: texture_2d<f32>;
@group(1) @binding(2)
var tex_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
    @location(2) texcoord: vec2<f32>,
    @location(3) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) color: vec3<f32>,
    @location(2) texcoord: vec2<f32>,
    @location(3) normal: vec3<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world = u.model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = u.projection * u.view * world;
    out.world_pos = world.xyz;
    out.color = vertex.color;
    out.texcoord = vertex.texcoord;
    out.normal = (u.model * vec4<f32>(vertex.normal, 0.0)).xyz;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(in.normal);
    let light = u.light_pos.xyz;

    let ambient = u.ambient.rgb;

    let to_light = normalize(light - in.world_pos);
    let diffuse = u.diffuse.rgb * clamp(dot(to_light, normal), 0.0, 1.0);

    let reflected = normalize(reflect(normalize(in.world_pos - light), normal));
    let to_view = normalize(u.camera_pos.xyz - in.world_pos);
    let shine = pow(max(dot(to_view, reflected), 0.0), 35.0);
    let specular_map = textureSample(specular_tex, tex_sampler, in.texcoord).rgb;
    let specular = u.specular.rgb * shine * specular_map;

    let base = textureSample(diffuse_tex, tex_sampler, in.texcoord) * vec4<f32>(in.color, 1.0);
    return base * (vec4<f32>(ambient, 1.0) + vec4<f32>(diffuse, 1.0) + vec4<f32>(specular, 1.0));
}
"#;
