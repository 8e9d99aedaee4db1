use wander_engine::host::EngineConfig;
use wander_engine::pal::{DrawCall, HeadlessPal, Pal, PalKind, VectorTarget};
use wander_engine::vector::{PaintStyle, PathVerb};
use wander_engine::{Runtime, RuntimeConfig};

fn runtime() -> Runtime<HeadlessPal> {
    Runtime::with_config(
        HeadlessPal::new(),
        RuntimeConfig {
            engine: EngineConfig {
                inherit_args: false,
                inherit_env: false,
                ..EngineConfig::default()
            },
            ..RuntimeConfig::default()
        },
    )
}

fn output(version: u32, kind: u32, payload: &[u8], material: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for word in [version, payload.len() as u32, kind] {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out.extend_from_slice(payload);
    out.extend_from_slice(&(material.len() as u32).to_le_bytes());
    out.extend_from_slice(material.as_bytes());
    out
}

fn wat_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("\\{b:02x}")).collect()
}

/// A renderlet whose `start` returns `output` stored at offset 64.
fn renderlet(output: &[u8]) -> String {
    format!(
        r#"(module
             (memory (export "memory") 1)
             (func (export "start") (result i32) (i32.const 64))
             (data (i32.const 64) "{}"))"#,
        wat_string(output)
    )
}

fn vertices(count: usize) -> Vec<u8> {
    // 11 floats per vertex: position, normal, uv, color.
    let mut out = Vec::with_capacity(count * 44);
    for v in 0..count {
        for f in 0..11 {
            out.extend_from_slice(&((v * 11 + f) as f32).to_le_bytes());
        }
    }
    out
}

#[test]
fn single_vertex_wall() {
    let mut rt = runtime();
    let id = rt
        .load_from_bytes(renderlet(&output(1, 0, &vertices(1), "wall,0,1,0,0")).as_bytes(), None)
        .unwrap();

    let tree = rt.render(id, None, false).unwrap();
    let tree = rt.render_tree(tree).unwrap();

    assert_eq!(tree.len(), 1);
    let node = tree.node_at(0).unwrap();
    assert_eq!(node.tag(), "wall");
    assert_eq!((node.offset(), node.length()), (0, 1));

    let buffer = node.buffer_id().unwrap();
    assert_eq!(rt.pal().buffer_data(buffer).unwrap(), vertices(1).as_slice());
}

#[test]
fn nodes_stay_inside_the_payload() {
    let mut rt = runtime();
    let material = "floor,0,6,0,0\nwall,6,12,0,0\nroof,18,3,x,y\n";
    let id = rt
        .load_from_bytes(renderlet(&output(1, 0, &vertices(21), material)).as_bytes(), None)
        .unwrap();
    let tree = rt.render(id, None, false).unwrap();
    let tree = rt.render_tree(tree).unwrap();

    let ranges: Vec<_> = tree.iter().map(|n| (n.tag().to_string(), n.offset(), n.length())).collect();
    assert_eq!(
        ranges,
        vec![
            ("floor".to_string(), 0, 6),
            ("wall".to_string(), 6, 12),
            ("roof".to_string(), 18, 3)
        ]
    );
    let elements = (21 * 44) / 44;
    assert!(tree.iter().all(|n| n.offset() + n.length() <= elements));
}

#[test]
fn version_comes_from_parameters() {
    // `start(version)` writes the version word and returns the output offset.
    let tail = output(1, 0, &vertices(1), "wall,0,1,0,0");
    let wat = format!(
        r#"(module
             (memory (export "memory") 1)
             (func (export "start") (param i32) (result i32)
               (i32.store (i32.const 64) (local.get 0))
               (i32.const 64))
             (data (i32.const 68) "{}"))"#,
        wat_string(&tail[4..])
    );

    let mut rt = runtime();
    let id = rt.load_from_bytes(wat.as_bytes(), None).unwrap();

    rt.push_param(id, 2u32);
    assert_eq!(rt.render(id, None, false), None);
    assert_eq!(rt.tree_count(), 0);
    assert_eq!(rt.pal().live_buffers(), 0);

    rt.push_param(id, 1u32);
    assert!(rt.render(id, None, false).is_some());
    assert_eq!(rt.tree_count(), 1);
}

#[test]
fn pooled_builds_share_one_buffer() {
    let mut rt = runtime();
    let first = rt
        .load_from_bytes(renderlet(&output(1, 0, &vertices(2), "a,0,2,0,0")).as_bytes(), None)
        .unwrap();
    let second = rt
        .load_from_bytes(renderlet(&output(1, 0, &vertices(3), "b,0,1,0,0\nc,1,2,0,0")).as_bytes(), None)
        .unwrap();

    let t0 = rt.render(first, None, true).unwrap();
    let t1 = rt.render(second, None, true).unwrap();
    assert_eq!(rt.render_tree(t0).unwrap().node_at(0).unwrap().buffer_id(), None);
    assert_eq!(rt.pool().used(), 5 * 44);

    let buffer = rt.upload_buffer_pool(44).unwrap();
    assert!(rt.pool().is_empty());
    assert_eq!(rt.pool().used(), 0);

    let offsets: Vec<_> = [t0, t1]
        .iter()
        .flat_map(|&t| rt.render_tree(t).unwrap().iter().map(|n| (n.buffer_id(), n.offset())).collect::<Vec<_>>())
        .collect();
    assert_eq!(
        offsets,
        vec![(Some(buffer), 0), (Some(buffer), 2), (Some(buffer), 3)]
    );
    assert_eq!(rt.pal().buffer_data(buffer).unwrap().len(), 5 * 44);

    assert!(rt.draw_node(t1, 1, 44));
    assert_eq!(
        rt.pal().draw_calls(),
        &[DrawCall::TriangleList { buffer, offset: 3, length: 2, stride: 44 }]
    );

    // The shared buffer lives until its last tree goes.
    rt.destroy_render_tree(t0);
    assert_eq!(rt.pal().live_buffers(), 1);
    rt.destroy_render_tree(t1);
    assert_eq!(rt.pal().live_buffers(), 0);
}

#[test]
fn vector_output_makes_one_rangeless_node() {
    let mut stream = Vec::new();
    let paint: [u32; 5] = [1, 0xFF3366CC, 0, 0, 0];
    for word in paint {
        stream.extend_from_slice(&word.to_le_bytes());
    }
    stream.extend_from_slice(&[3, 0, 0, 0]);
    stream.extend_from_slice(&3i32.to_le_bytes());
    for (verb, [x, y]) in [(1i32, [0.0f32, 0.0]), (2, [16.0, 0.0]), (2, [0.0, 16.0])] {
        stream.extend_from_slice(&verb.to_le_bytes());
        stream.extend_from_slice(&1i32.to_le_bytes());
        stream.extend_from_slice(&x.to_le_bytes());
        stream.extend_from_slice(&y.to_le_bytes());
    }
    stream.extend_from_slice(&[0; 24]);
    stream.extend_from_slice(&0i32.to_le_bytes());

    // Vector output carries no material section.
    let mut out = Vec::new();
    for word in [1u32, stream.len() as u32, 2] {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out.extend_from_slice(&stream);

    let mut rt = runtime();
    let id = rt.load_from_bytes(renderlet(&out).as_bytes(), None).unwrap();
    let tree_id = rt.render(id, None, false).unwrap();
    let tree = rt.render_tree(tree_id).unwrap();

    assert_eq!(tree.len(), 1);
    let node = tree.node_at(0).unwrap();
    assert_eq!((node.offset(), node.length(), node.buffer_id()), (0, 0, None));

    let vector = node.vector_id().unwrap();
    let commands = rt.pal().vector_commands(vector).unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].paint.style, PaintStyle::Fill);
    assert_eq!(commands[0].paint.color, 0xFF3366CC);
    let verbs: Vec<_> = commands[0].path.iter().map(|s| s.verb).collect();
    assert_eq!(verbs, vec![PathVerb::Move, PathVerb::Line, PathVerb::Line]);

    assert!(rt.draw_vector(tree_id, 0, VectorTarget::from_slot(-1), 32, 32));
    let surface = rt.pal().surface_image().unwrap();
    let at = (32 + 2) * 4;
    assert_eq!(&surface.pixels[at..at + 4], &[0x33, 0x66, 0xCC, 0xFF]);
}

#[test]
fn evaluate_reads_scalars() {
    let wat = r#"(module
        (memory (export "memory") 1)
        (func (export "start") (result i32) (i32.const 0))
        (func (export "Tint") (param f32) (result i32)
          (f32.store (i32.const 32) (local.get 0))
          (i32.const 32))
        (data (i32.const 36) "\00\00\00\3f\00\00\80\3e\00\00\80\3f"))"#;

    let mut rt = runtime();
    let id = rt.load_from_bytes(wat.as_bytes(), None).unwrap();
    rt.push_param(id, 0.25f32);
    assert_eq!(rt.evaluate_float4(id, "Tint"), [0.25, 0.5, 0.25, 1.0]);

    rt.push_param(id, 3.0f32);
    assert_eq!(rt.evaluate(id, "Tint"), 32);
    assert_eq!(rt.read_memory(id, 32, 4).unwrap(), &3.0f32.to_le_bytes());
}

#[test]
fn dropping_the_runtime_releases_everything() {
    let mut rt = Runtime::<Box<dyn Pal>>::with_config(
        wander_engine::pal::create_pal(wander_engine::pal::PalRequest::Headless),
        RuntimeConfig {
            engine: EngineConfig {
                inherit_args: false,
                inherit_env: false,
                ..EngineConfig::default()
            },
            ..RuntimeConfig::default()
        },
    );
    assert_eq!(rt.pal().kind(), PalKind::Headless);
    let id = rt
        .load_from_bytes(renderlet(&output(1, 0, &vertices(1), "wall,0,1,0,0")).as_bytes(), None)
        .unwrap();
    assert!(rt.render(id, None, false).is_some());
    assert_eq!(rt.host().loaded(), 1);
    drop(rt);
}
