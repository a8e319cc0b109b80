/// Normal-direction material: surface colour is the view-space normal mapped
/// into `0..1`, with a uniform alpha.
pub const MESH_SHADER: &str = r#"
struct MeshUniforms {
    mvp: mat4x4<f32>,
    model_view: mat4x4<f32>,
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> mesh: MeshUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) view_normal: vec3<f32>,
};

@vertex
fn vs_mesh(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = mesh.mvp * vec4<f32>(vertex.position, 1.0);
    out.view_normal = (mesh.model_view * vec4<f32>(vertex.normal, 0.0)).xyz;
    return out;
}

@fragment
fn fs_mesh(in: VertexOutput, @builtin(front_facing) front: bool) -> @location(0) vec4<f32> {
    var n = normalize(in.view_normal);
    if (!front) {
        n = -n;
    }
    return vec4<f32>(n * 0.5 + 0.5, mesh.params.x);
}
"#;

/// Full-surface video background drawn from a single oversized triangle.
pub const BACKGROUND_SHADER: &str = r#"
struct BackgroundUniforms {
    crop: mat4x4<f32>,
};

@group(0) @binding(0)
var frame_texture: texture_2d<f32>;
@group(0) @binding(1)
var frame_sampler: sampler;
@group(0) @binding(2)
var<uniform> background: BackgroundUniforms;

struct BackgroundOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

// Full-canvas triangle, placed on the surface by the crop matrix.
@vertex
fn vs_background(@builtin(vertex_index) index: u32) -> BackgroundOutput {
    let corner = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: BackgroundOutput;
    out.clip_position = background.crop * vec4<f32>(corner * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(corner.x, 1.0 - corner.y);
    return out;
}

@fragment
fn fs_background(in: BackgroundOutput) -> @location(0) vec4<f32> {
    let color = textureSample(frame_texture, frame_sampler, in.uv);
    if any(in.uv < vec2<f32>(0.0)) || any(in.uv > vec2<f32>(1.0)) {
        discard;
    }
    return color;
}
"#;
