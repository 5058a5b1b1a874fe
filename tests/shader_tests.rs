//! Shader Graph Builder Tests
//!
//! Tests for:
//! - Socket validation and single-link inputs
//! - PBR / depth / normal / albedo variants built from one description
//! - Max-depth patching
//! - Texture transform sampler mapping
//! - Background graphs and the shared shader registry
//! - Sky cache invalidation on background switches

use std::f32::consts::FRAC_PI_2;

use glam::{Vec2, Vec3, Vec4};

use pathscene::renderer::scene::{ImageKey, ImageParams, ImageResource};
use pathscene::renderer::shader_graph::{GraphNodeId, ShaderGraph, ShaderNode, SkyTexture};
use pathscene::renderer::RenderScene;
use pathscene::shader::background::{apply_color, build_color_background, build_sky_background};
use pathscene::shader::material::{
    build_albedo, build_depth, build_pbr, build_variants, max_depth_of, set_max_depth,
};
use pathscene::scene::{SceneGraph, DEFAULT_MAX_DEPTH};
use pathscene::shader::registry::{BACKGROUND_COLOR, DEFAULT_SURFACE, LIGHT, LIGHT_DISABLED};
use pathscene::shader::{
    BackgroundKind, BackgroundSettings, MaterialDesc, ShaderRegistry, TextureTransform,
};
use pathscene::SceneError;

const EPSILON: f32 = 1e-5;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn principled(graph: &ShaderGraph) -> GraphNodeId {
    graph
        .nodes_of(|n| matches!(n, ShaderNode::PrincipledBsdf(_)))
        .next()
        .expect("graph has a principled BSDF")
}

fn kind(graph: &ShaderGraph, id: GraphNodeId) -> &ShaderNode {
    &graph.node(id).unwrap().kind
}

fn has_image_nodes(graph: &ShaderGraph) -> bool {
    graph
        .nodes_of(|n| matches!(n, ShaderNode::ImageTexture { .. }))
        .next()
        .is_some()
}

// ============================================================================
// Graph primitives
// ============================================================================

#[test]
fn connect_rejects_unknown_sockets() {
    let mut graph = ShaderGraph::new();
    let color = graph.add(ShaderNode::Color { value: Vec3::ONE });

    let err = graph.connect_surface(color, "Colour");
    assert!(matches!(err, Err(SceneError::UnknownSocket { .. })));

    let value = graph.add(ShaderNode::Value { value: 1.0 });
    let err = graph.connect(color, "Color", value, "Value");
    assert!(matches!(err, Err(SceneError::UnknownSocket { .. })));
}

#[test]
fn second_link_into_an_input_replaces_the_first() {
    let mut graph = ShaderGraph::new();
    let red = graph.add(ShaderNode::Color { value: Vec3::X });
    let green = graph.add(ShaderNode::Color { value: Vec3::Y });

    graph.connect_surface(red, "Color").unwrap();
    graph.connect_surface(green, "Color").unwrap();

    assert_eq!(graph.links().len(), 1);
    assert_eq!(graph.surface_source().unwrap().node, green);
}

// ============================================================================
// Material variants
// ============================================================================

#[test]
fn untextured_red_material_is_constant_red() {
    let desc = MaterialDesc::builder("red")
        .albedo(Vec4::new(1.0, 0.0, 0.0, 1.0))
        .build();

    let pbr = build_pbr(&desc).unwrap();
    assert!(!has_image_nodes(&pbr));
    let bsdf = principled(&pbr);
    let base = pbr.link_into(bsdf, "Base Color").unwrap();
    match kind(&pbr, base.node) {
        ShaderNode::Color { value } => assert!(approx_vec3(*value, Vec3::X)),
        other => panic!("base colour fed by {other:?}"),
    }
    assert_eq!(pbr.surface_source().unwrap().node, bsdf);

    let albedo = build_albedo(&desc).unwrap();
    assert!(!has_image_nodes(&albedo));
    let source = albedo.surface_source().unwrap();
    match kind(&albedo, source.node) {
        ShaderNode::Color { value } => assert!(approx_vec3(*value, Vec3::X)),
        other => panic!("albedo surface fed by {other:?}"),
    }
}

#[test]
fn pbr_wires_scalar_parameters() {
    let desc = MaterialDesc::builder("glass")
        .albedo(Vec4::new(0.2, 0.4, 0.6, 0.5))
        .metallic(0.1)
        .roughness(0.7)
        .transmission(1.0)
        .ior(1.33)
        .emissive(Vec3::new(1.0, 0.5, 0.0), 3.0)
        .build();
    let graph = build_pbr(&desc).unwrap();
    let bsdf = principled(&graph);

    let ShaderNode::PrincipledBsdf(params) = kind(&graph, bsdf) else {
        unreachable!()
    };
    assert!((params.alpha - 0.5).abs() < EPSILON);
    assert!((params.ior - 1.33).abs() < EPSILON);
    assert!((params.transmission - 1.0).abs() < EPSILON);
    assert!((params.specular - 0.5).abs() < EPSILON);
    assert!((params.emission_strength - 3.0).abs() < EPSILON);

    let roughness = graph.link_into(bsdf, "Roughness").unwrap();
    assert_eq!(graph.link_into(bsdf, "Transmission Roughness"), Some(roughness));
    match kind(&graph, roughness.node) {
        ShaderNode::Value { value } => assert!((value - 0.7).abs() < EPSILON),
        other => panic!("roughness fed by {other:?}"),
    }
    assert_eq!(
        graph.link_into(bsdf, "Base Color"),
        graph.link_into(bsdf, "Subsurface Color")
    );
    assert!(graph.link_into(bsdf, "Normal").is_none());
}

#[test]
fn textured_material_samples_its_images() {
    let albedo_tex = ImageKey::default();
    let desc = MaterialDesc::builder("textured")
        .albedo_texture(albedo_tex, TextureTransform::default())
        .metallic_roughness_texture(albedo_tex, TextureTransform::default())
        .normal_texture(albedo_tex, TextureTransform::default(), 0.8)
        .build();

    let graph = build_pbr(&desc).unwrap();
    assert_eq!(graph.images().count(), 3);

    let bsdf = principled(&graph);
    let base = graph.link_into(bsdf, "Base Color").unwrap();
    assert!(matches!(kind(&graph, base.node), ShaderNode::VectorMath { .. }));
    let normal = graph.link_into(bsdf, "Normal").unwrap();
    match kind(&graph, normal.node) {
        ShaderNode::NormalMap { strength, .. } => assert!((strength - 0.8).abs() < EPSILON),
        other => panic!("normal fed by {other:?}"),
    }
    let metallic = graph.link_into(bsdf, "Metallic").unwrap();
    assert!(matches!(kind(&graph, metallic.node), ShaderNode::Math { .. }));

    assert_eq!(desc.used_images(), vec![albedo_tex]);
}

#[test]
fn ior_never_drops_to_one() {
    let desc = MaterialDesc::builder("air").ior(1.0).build();
    let graph = build_pbr(&desc).unwrap();
    let ShaderNode::PrincipledBsdf(params) = kind(&graph, principled(&graph)) else {
        unreachable!()
    };
    assert!(params.ior > 1.0);
}

#[test]
fn all_variants_terminate_in_the_output() {
    let desc = MaterialDesc::builder("plain").build();
    let variants = build_variants(&desc, 50.0).unwrap();
    for (mode, graph) in variants.iter() {
        assert!(graph.surface_source().is_some(), "{mode:?} has no surface link");
    }
    assert_eq!(max_depth_of(&variants.depth), Some(50.0));
}

#[test]
fn max_depth_patch_reports_changes() {
    let mut graph = build_depth(10.0).unwrap();
    assert!(!set_max_depth(&mut graph, 10.0));
    assert!(set_max_depth(&mut graph, 25.0));
    assert_eq!(max_depth_of(&graph), Some(25.0));

    let mut albedo = build_albedo(&MaterialDesc::default()).unwrap();
    assert!(!set_max_depth(&mut albedo, 25.0));
    assert_eq!(max_depth_of(&albedo), None);
}

// ============================================================================
// Texture transforms
// ============================================================================

#[test]
fn default_texture_transform_is_identity_mapping() {
    let mapping = TextureTransform::default().sampler_mapping();
    assert!(approx_vec3(mapping.translation, Vec3::ZERO));
    assert!(approx_vec3(mapping.rotation, Vec3::ZERO));
    assert!(approx_vec3(mapping.scale, Vec3::ONE));
}

#[test]
fn texture_scale_inverts_and_zero_is_replaced() {
    let mapping = TextureTransform::new(Vec2::ZERO, 0.0, Vec2::new(2.0, 4.0)).sampler_mapping();
    assert!(approx_vec3(mapping.scale, Vec3::new(0.5, 0.25, 1.0)));

    let mapping = TextureTransform::new(Vec2::ZERO, FRAC_PI_2, Vec2::new(0.0, 1.0)).sampler_mapping();
    assert!(mapping.translation.is_finite());
    assert!((mapping.scale.x - 1.0).abs() < EPSILON);
    assert!((mapping.rotation.z + FRAC_PI_2).abs() < EPSILON);
}

// ============================================================================
// Backgrounds and registry
// ============================================================================

#[test]
fn color_background_patches_in_place() {
    let mut graph = build_color_background(Vec3::ZERO).unwrap();
    assert!(apply_color(&mut graph, Vec3::new(0.1, 0.2, 0.3)));
    let source = graph.surface_source().unwrap();
    match kind(&graph, source.node) {
        ShaderNode::Color { value } => assert!(approx_vec3(*value, Vec3::new(0.1, 0.2, 0.3))),
        other => panic!("background fed by {other:?}"),
    }

    let mut sky = build_sky_background(Vec3::Y).unwrap();
    assert!(!apply_color(&mut sky, Vec3::ONE));
}

#[test]
fn registry_installs_shared_shaders() {
    let mut scene = RenderScene::new();
    let registry = ShaderRegistry::install(&mut scene).unwrap();

    assert_eq!(scene.num_shaders(), 5);
    assert_eq!(
        scene.default_background(),
        Some(registry.background(BackgroundKind::Color))
    );
    let name_of = |key| scene.shader(key).unwrap().name.as_str();
    assert_eq!(name_of(registry.background(BackgroundKind::Color)), BACKGROUND_COLOR);
    assert_eq!(name_of(registry.default_surface()), DEFAULT_SURFACE);
    assert_eq!(name_of(registry.light(true)), LIGHT);
    assert_eq!(name_of(registry.light(false)), LIGHT_DISABLED);

    let disabled = scene.shader(registry.light(false)).unwrap();
    let emission = disabled.graph.surface_source().unwrap();
    match kind(&disabled.graph, emission.node) {
        ShaderNode::Emission { strength, .. } => assert_eq!(*strength, 0.0),
        other => panic!("light shader fed by {other:?}"),
    }
}

#[test]
fn two_scenes_get_independent_registries() {
    let mut first = RenderScene::new();
    let mut second = RenderScene::new();
    let a = ShaderRegistry::install(&mut first).unwrap();
    let b = ShaderRegistry::install(&mut second).unwrap();

    assert!(first.shader(a.default_surface()).is_some());
    assert!(second.shader(b.default_surface()).is_some());
    assert_eq!(first.num_shaders(), second.num_shaders());
}

// ============================================================================
// Sky cache
// ============================================================================

fn sky_node(graph: &ShaderGraph) -> &SkyTexture {
    graph
        .nodes()
        .find_map(|(_, n)| match &n.kind {
            ShaderNode::SkyTexture(sky) => Some(sky),
            _ => None,
        })
        .expect("sky background has a sky texture")
}

#[test]
fn switching_background_drops_the_baked_sky() {
    let mut scene = RenderScene::new();
    let mut graph = SceneGraph::new(&mut scene, DEFAULT_MAX_DEPTH).unwrap();
    graph.set_background(
        &mut scene,
        BackgroundSettings::Sky {
            sun_direction: Vec3::new(0.0, 1.0, 1.0),
        },
    );

    let baked = scene.add_image(ImageResource {
        name: "baked_sky".into(),
        params: ImageParams::default(),
        pixels: image::DynamicImage::new_rgba8(4, 2),
    });
    let sky = graph.registry().background(BackgroundKind::Sky);
    {
        let mut shader = scene.shader_mut(sky).unwrap();
        for node in shader.graph.nodes_mut() {
            if let ShaderNode::SkyTexture(texture) = &mut node.kind {
                texture.cached_image = Some(baked);
            }
        }
    }
    assert_eq!(sky_node(&scene.shader(sky).unwrap().graph).cached_image, Some(baked));

    graph.set_background(&mut scene, BackgroundSettings::Color(Vec3::ONE));

    assert!(scene.image(baked).is_none());
    assert!(scene.images().all(|(key, _)| key != baked));
    assert_eq!(sky_node(&scene.shader(sky).unwrap().graph).cached_image, None);
    assert_eq!(
        scene.default_background(),
        Some(graph.registry().background(BackgroundKind::Color))
    );
}
