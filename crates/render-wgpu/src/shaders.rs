/// WGSL shader for instanced, textured, rotated unit quads.
///
/// The quad corners come from the vertex index; every instance carries its
/// own position, rotation and UV rectangle.
pub const SPRITE_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

@group(1) @binding(0)
var sprite_texture: texture_2d<f32>;
@group(1) @binding(1)
var sprite_sampler: sampler;

struct SpriteInstance {
    @location(0) position: vec2<f32>,
    @location(1) rotation: f32,
    @location(2) uv_min: vec2<f32>,
    @location(3) uv_max: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

var<private> CORNERS: array<vec2<f32>, 6> = array<vec2<f32>, 6>(
    vec2<f32>(-0.5, -0.5),
    vec2<f32>( 0.5, -0.5),
    vec2<f32>( 0.5,  0.5),
    vec2<f32>(-0.5, -0.5),
    vec2<f32>( 0.5,  0.5),
    vec2<f32>(-0.5,  0.5),
);

@vertex
fn vs_sprite(@builtin(vertex_index) index: u32, instance: SpriteInstance) -> VertexOutput {
    let corner = CORNERS[index];
    let c = cos(instance.rotation);
    let s = sin(instance.rotation);
    let rotated = vec2<f32>(c * corner.x - s * corner.y, s * corner.x + c * corner.y);
    let world = instance.position + rotated;

    // Texture space has V growing down, world space has Y growing up.
    let t = corner + vec2<f32>(0.5, 0.5);
    let uv = vec2<f32>(
        mix(instance.uv_min.x, instance.uv_max.x, t.x),
        mix(instance.uv_max.y, instance.uv_min.y, t.y),
    );

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(world, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_sprite(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(sprite_texture, sprite_sampler, in.uv);
}
"#;
