//! Scene Graph Tests
//!
//! Tests for:
//! - Node creation, id lookup and parent/child links
//! - Transform propagation through the hierarchy
//! - Visibility cascading and effective visibility
//! - Subtree removal and id map cleanup
//! - Mesh and light attachments following their node

use glam::{Quat, Vec3};

use pathscene::renderer::scene::RayVisibility;
use pathscene::renderer::RenderScene;
use pathscene::scene::{LightDesc, NodeKey, SceneGraph, DEFAULT_MAX_DEPTH};
use pathscene::{MeshDesc, SceneError};

const EPSILON: f32 = 1e-5;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn setup() -> (RenderScene, SceneGraph) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut scene = RenderScene::new();
    let graph = SceneGraph::new(&mut scene, DEFAULT_MAX_DEPTH).unwrap();
    (scene, graph)
}

fn add(
    graph: &mut SceneGraph,
    scene: &mut RenderScene,
    parent: Option<NodeKey>,
    id: u64,
    translation: Vec3,
) -> NodeKey {
    graph
        .add_node(scene, parent, id, &format!("node{id}"), translation, Quat::IDENTITY, Vec3::ONE)
        .unwrap()
}

fn world_translation(graph: &SceneGraph, key: NodeKey) -> Vec3 {
    graph.world_matrix(key).unwrap().translation.into()
}

fn triangle(graph: &mut SceneGraph, scene: &mut RenderScene) -> pathscene::renderer::GeometryKey {
    let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let desc = MeshDesc {
        name: "tri",
        positions: &positions,
        normals: None,
        uvs: None,
        indices: &[0, 1, 2],
        triangle_counts: &[1],
        materials: &[None],
    };
    graph.add_mesh(scene, &desc).unwrap()
}

// ============================================================================
// Hierarchy and transforms
// ============================================================================

#[test]
fn child_composes_with_parent() {
    let (mut scene, mut graph) = setup();
    let a = add(&mut graph, &mut scene, None, 1, Vec3::ZERO);
    let b = add(&mut graph, &mut scene, Some(a), 2, Vec3::X);

    assert!(approx_vec3(world_translation(&graph, b), Vec3::X));
    assert_eq!(graph.node(a).unwrap().children(), &[b]);
    assert_eq!(graph.node(b).unwrap().parent(), Some(a));
    assert_eq!(graph.get_node(2), Some(b));
    assert_eq!(graph.roots(), &[a]);
}

#[test]
fn parent_update_moves_children() {
    let (mut scene, mut graph) = setup();
    let a = add(&mut graph, &mut scene, None, 1, Vec3::ZERO);
    let b = add(&mut graph, &mut scene, Some(a), 2, Vec3::X);

    graph
        .update_transform(&mut scene, a, Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE)
        .unwrap();

    assert!(approx_vec3(world_translation(&graph, b), Vec3::new(3.0, 0.0, 0.0)));
}

#[test]
fn composed_matrix_matches_parent_times_local_everywhere() {
    let (mut scene, mut graph) = setup();
    let a = add(&mut graph, &mut scene, None, 1, Vec3::new(0.0, 1.0, 0.0));
    let b = graph
        .add_node(
            &mut scene,
            Some(a),
            2,
            "b",
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_rotation_y(0.7),
            Vec3::splat(2.0),
        )
        .unwrap();
    let c = add(&mut graph, &mut scene, Some(b), 3, Vec3::new(0.0, 0.0, 1.0));

    graph
        .update_transform(&mut scene, a, Vec3::new(5.0, 0.0, 0.0), Quat::from_rotation_z(0.3), Vec3::ONE)
        .unwrap();

    for key in [b, c] {
        let node = graph.node(key).unwrap();
        let parent = graph.world_matrix(node.parent().unwrap()).unwrap();
        let expected = parent * node.transform().local_matrix();
        let actual = *node.world_matrix();
        for (x, y) in actual.to_cols_array().iter().zip(expected.to_cols_array().iter()) {
            assert!((x - y).abs() < 1e-4);
        }
    }
}

#[test]
fn unknown_parent_is_rejected() {
    let (mut scene, mut graph) = setup();
    let a = add(&mut graph, &mut scene, None, 1, Vec3::ZERO);
    graph.remove_node(&mut scene, a).unwrap();

    let err = graph.add_node(&mut scene, Some(a), 2, "orphan", Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
    assert!(matches!(err, Err(SceneError::NodeNotFound)));
}

#[test]
fn duplicate_id_latest_wins() {
    let (mut scene, mut graph) = setup();
    let first = add(&mut graph, &mut scene, None, 7, Vec3::ZERO);
    let second = add(&mut graph, &mut scene, None, 7, Vec3::X);

    assert_ne!(first, second);
    assert_eq!(graph.get_node(7), Some(second));

    // Removing the shadowed node leaves the newer mapping intact.
    graph.remove_node(&mut scene, first).unwrap();
    assert_eq!(graph.get_node(7), Some(second));
}

// ============================================================================
// Removal
// ============================================================================

#[test]
fn removing_a_node_removes_its_subtree() {
    let (mut scene, mut graph) = setup();
    let root = add(&mut graph, &mut scene, None, 1, Vec3::ZERO);
    let a = add(&mut graph, &mut scene, Some(root), 2, Vec3::ZERO);
    let b = add(&mut graph, &mut scene, Some(a), 3, Vec3::ZERO);
    let c = add(&mut graph, &mut scene, Some(b), 4, Vec3::ZERO);
    let sibling = add(&mut graph, &mut scene, Some(root), 5, Vec3::ZERO);

    let mesh = triangle(&mut graph, &mut scene);
    graph.assign_mesh_to_node(&mut scene, c, mesh).unwrap();
    graph
        .add_light_to_node(&mut scene, b, &LightDesc::point(Vec3::ONE, 10.0, 5.0))
        .unwrap();
    assert_eq!(scene.num_objects(), 1);
    assert_eq!(scene.num_lights(), 1);

    graph.remove_node(&mut scene, a).unwrap();

    for (key, id) in [(a, 2), (b, 3), (c, 4)] {
        assert!(graph.node(key).is_none());
        assert_eq!(graph.get_node(id), None);
    }
    assert_eq!(graph.node(root).unwrap().children(), &[sibling]);
    assert_eq!(scene.num_objects(), 0);
    assert_eq!(scene.num_lights(), 0);
    assert_eq!(graph.num_nodes(), 2);
}

#[test]
fn removing_twice_fails() {
    let (mut scene, mut graph) = setup();
    let a = add(&mut graph, &mut scene, None, 1, Vec3::ZERO);
    graph.remove_node(&mut scene, a).unwrap();
    assert!(graph.roots().is_empty());
    assert!(matches!(
        graph.remove_node(&mut scene, a),
        Err(SceneError::NodeNotFound)
    ));
}

// ============================================================================
// Visibility
// ============================================================================

#[test]
fn hiding_a_parent_hides_descendants() {
    let (mut scene, mut graph) = setup();
    let a = add(&mut graph, &mut scene, None, 1, Vec3::ZERO);
    let b = add(&mut graph, &mut scene, Some(a), 2, Vec3::ZERO);
    let c = add(&mut graph, &mut scene, Some(b), 3, Vec3::ZERO);

    let mesh = triangle(&mut graph, &mut scene);
    let object = graph.assign_mesh_to_node(&mut scene, c, mesh).unwrap();
    let light = graph
        .add_light_to_node(&mut scene, b, &LightDesc::directional(Vec3::ONE, 100.0))
        .unwrap();

    graph.update_visibility(&mut scene, a, false).unwrap();
    for key in [a, b, c] {
        assert_eq!(graph.effective_visibility(key), Some(false));
    }
    assert_eq!(scene.object(object).unwrap().visibility, RayVisibility::empty());
    assert_eq!(
        scene.light(light).unwrap().shader,
        Some(graph.registry().light(false))
    );

    // A descendant switched back on stays hidden under its hidden ancestor.
    graph.update_visibility(&mut scene, c, true).unwrap();
    assert!(graph.node(c).unwrap().is_visible());
    assert_eq!(graph.effective_visibility(c), Some(false));
    assert_eq!(scene.object(object).unwrap().visibility, RayVisibility::empty());

    graph.update_visibility(&mut scene, a, true).unwrap();
    assert_eq!(graph.effective_visibility(c), Some(true));
    assert_eq!(scene.object(object).unwrap().visibility, RayVisibility::all());
    assert_eq!(
        scene.light(light).unwrap().shader,
        Some(graph.registry().light(true))
    );
}

#[test]
fn mesh_assigned_under_hidden_parent_starts_hidden() {
    let (mut scene, mut graph) = setup();
    let a = add(&mut graph, &mut scene, None, 1, Vec3::ZERO);
    graph.update_visibility(&mut scene, a, false).unwrap();
    let b = add(&mut graph, &mut scene, Some(a), 2, Vec3::ZERO);

    let mesh = triangle(&mut graph, &mut scene);
    let object = graph.assign_mesh_to_node(&mut scene, b, mesh).unwrap();
    assert_eq!(scene.object(object).unwrap().visibility, RayVisibility::empty());
}

// ============================================================================
// Attachments
// ============================================================================

#[test]
fn attachments_follow_node_transform() {
    let (mut scene, mut graph) = setup();
    let a = add(&mut graph, &mut scene, None, 1, Vec3::ZERO);
    let b = add(&mut graph, &mut scene, Some(a), 2, Vec3::new(0.0, 0.0, 1.0));

    let mesh = triangle(&mut graph, &mut scene);
    let object = graph.assign_mesh_to_node(&mut scene, b, mesh).unwrap();
    let light = graph
        .add_light_to_node(&mut scene, b, &LightDesc::spot(Vec3::ONE, 50.0, 10.0, 0.2, 0.4))
        .unwrap();

    graph
        .update_transform(&mut scene, a, Vec3::new(0.0, 3.0, 0.0), Quat::IDENTITY, Vec3::ONE)
        .unwrap();

    let object = scene.object(object).unwrap();
    assert!(approx_vec3(object.tfm.translation.into(), Vec3::new(0.0, 3.0, 1.0)));
    assert_eq!(object.transform_id, graph.node(b).unwrap().transform_id());

    let light = scene.light(light).unwrap();
    assert!(approx_vec3(light.co, Vec3::new(0.0, 3.0, 1.0)));
    assert!(approx_vec3(light.dir, Vec3::NEG_Z));
    assert!((light.spot_angle - 0.8).abs() < EPSILON);
}

#[test]
fn reassigning_a_mesh_replaces_the_object() {
    let (mut scene, mut graph) = setup();
    let a = add(&mut graph, &mut scene, None, 1, Vec3::ZERO);
    let mesh = triangle(&mut graph, &mut scene);

    let first = graph.assign_mesh_to_node(&mut scene, a, mesh).unwrap();
    let second = graph.assign_mesh_to_node(&mut scene, a, mesh).unwrap();

    assert!(scene.object(first).is_none());
    assert!(scene.object(second).is_some());
    assert_eq!(scene.num_objects(), 1);
    assert_eq!(graph.node(a).unwrap().mesh_object(), Some(second));
}

#[test]
fn light_removal_checks_ownership() {
    let (mut scene, mut graph) = setup();
    let a = add(&mut graph, &mut scene, None, 1, Vec3::ZERO);
    let b = add(&mut graph, &mut scene, None, 2, Vec3::ZERO);
    let light = graph
        .add_light_to_node(&mut scene, a, &LightDesc::point(Vec3::ONE, 1.0, 1.0))
        .unwrap();

    assert!(matches!(
        graph.remove_light_from_node(&mut scene, b, light),
        Err(SceneError::LightNotOnNode)
    ));
    graph.remove_light_from_node(&mut scene, a, light).unwrap();
    assert!(graph.node(a).unwrap().lights().is_empty());
    assert_eq!(scene.num_lights(), 0);
}

#[test]
fn unknown_light_code_is_an_error() {
    let err = LightDesc::from_code(9, Vec3::ONE, 1.0, 1.0, 0.0, 0.0);
    assert!(matches!(err, Err(SceneError::UnknownLightType(9))));
}
