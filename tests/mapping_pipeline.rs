use std::sync::Arc;

use serde_json::json;
use text_mapping_render::{
    renderer::{
        Bounds, IndicesOptions, Mapping, MaterialBuildOptions, MaterialBuilder, MaterialSlot,
        MaterialSpec, RasterizedText, build_bounds_texture, build_indices_texture,
        paint_indices, read_indices_texel,
    },
    text::Text,
};

fn mapping_of(sizes: &[(u32, u32)]) -> Mapping {
    Mapping::from_rasterized(
        sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| (Text::new(format!("text {i}")), RasterizedText::blank(w, h)))
            .collect(),
    )
}

fn material_spec(uniforms: serde_json::Value) -> MaterialSpec {
    serde_json::from_value(json!({
        "uniforms": uniforms,
        "mainImage": "void mainImage(out vec4 fragColor, in vec2 fragCoord) {\n    fragColor = textTexture(fragCoord / uResolution);\n}"
    }))
    .unwrap()
}

#[test]
fn three_texts_pack_and_index_their_centres() {
    let mapping = mapping_of(&[(40, 20), (60, 30), (20, 20)]);
    let entries = mapping.entries();
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            assert!(!a.placement.intersects(&b.placement));
        }
        assert!(a.placement.right() <= mapping.width());
        assert!(a.placement.bottom() <= mapping.height());
    }
    let bin_area = mapping.width() as u64 * mapping.height() as u64;
    assert!(bin_area >= 40 * 20 + 60 * 30 + 20 * 20);

    let output = [mapping.width() * 2, mapping.height() * 2];
    let indices = build_indices_texture(&mapping, IndicesOptions::new(output));
    for entry in entries {
        let [cx, cy] = mapping.output_bounds(entry.index, output).unwrap().center();
        let texel = indices.get_pixel(cx as u32, cy as u32).0;
        assert_eq!(texel[3], 1.0);
        assert_eq!(
            read_indices_texel(&indices, cx as u32, cy as u32, 3),
            Some(entry.index)
        );
    }
}

#[test]
fn per_text_speed_lands_in_red_channel() {
    let mapping = Arc::new(mapping_of(&[(40, 20), (60, 30), (20, 20)]));
    let material = MaterialBuilder::default()
        .build(
            mapping,
            &material_spec(json!({"uSpeed": {"type": "1f", "perText": [0.1, 0.5, 0.9]}})),
        )
        .unwrap();

    let speed = material.user_uniform("uSpeed").unwrap();
    assert_eq!(speed.texture().dimensions(), (3, 1));
    let reds: Vec<f32> = speed.texture().pixels().map(|p| p.0[0]).collect();
    assert_eq!(reds, [0.1, 0.5, 0.9]);
}

#[test]
fn later_text_wins_where_bounds_overlap() {
    let bounds = [
        Bounds { x: 0.0, y: 0.0, width: 6.0, height: 4.0 },
        Bounds { x: 4.0, y: 0.0, width: 6.0, height: 4.0 },
    ];
    let indices = paint_indices(&bounds, IndicesOptions::new([10, 4]));
    assert_eq!(read_indices_texel(&indices, 2, 1, 2), Some(0));
    assert_eq!(read_indices_texel(&indices, 5, 1, 2), Some(1));
    assert_eq!(read_indices_texel(&indices, 8, 1, 2), Some(1));
}

#[test]
fn pixels_outside_every_text_are_masked() {
    // Two tall texts leave part of the bin uncovered.
    let mapping = mapping_of(&[(10, 40), (30, 10)]);
    let indices = build_indices_texture(&mapping, IndicesOptions::new(mapping.size()));
    let mut uncovered = 0;
    for (x, y, texel) in indices.enumerate_pixels() {
        if mapping.entries().iter().all(|e| !e.placement.contains(x, y)) {
            assert_eq!(texel.0[3], 0.0);
            uncovered += 1;
        }
    }
    assert!(uncovered > 0);
}

#[test]
fn rebuilding_is_bit_identical() {
    let sizes = [(40, 20), (60, 30), (20, 20), (5, 70), (33, 12)];
    let a = mapping_of(&sizes);
    let b = mapping_of(&sizes);
    let output = [300, 200];

    let ia = build_indices_texture(&a, IndicesOptions::new(output));
    let ib = build_indices_texture(&b, IndicesOptions::new(output));
    assert_eq!(ia.as_raw(), ib.as_raw());
    assert_eq!(
        build_bounds_texture(&a, output).as_raw(),
        build_bounds_texture(&b, output).as_raw()
    );
}

#[test]
fn material_slot_applies_only_the_newest_build() {
    let mut slot = MaterialSlot::new(MaterialBuilder::new(MaterialBuildOptions {
        output_size: Some([256, 256]),
        sample_accuracy: 1.0,
    }));
    slot.request_build(Arc::new(mapping_of(&[(10, 10)])), material_spec(json!({})));
    slot.request_build(
        Arc::new(mapping_of(&[(10, 10), (20, 20), (30, 30)])),
        material_spec(json!({})),
    );
    let material = slot.wait().unwrap();
    assert_eq!(material.text_count(), 3);
    assert_eq!(material.output_size(), [256, 256]);
}
