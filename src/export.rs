use serde::{Deserialize, Serialize};
use std::path::Path;

use svg::node::element::path::Data;
use svg::node::element::{ClipPath, Definitions, Group, Path as SvgPath, Rectangle};
use svg::Document;

use crate::error::TraceResult;

/// one accepted step as the vector side sees it, in acceptance order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub points: Vec<(i32, i32)>,
    pub color: [u8; 3],
    pub opacity: f32,
}

#[inline]
fn rgb(color: [u8; 3]) -> String {
    format!("rgb({}, {}, {})", color[0], color[1], color[2])
}

/// "M x,y L x,y ... Z" for a closed polygon
fn path_data(points: &[(i32, i32)]) -> Data {
    let mut data = Data::new();
    for (i, &(x, y)) in points.iter().enumerate() {
        let p = (x as f32, y as f32);
        data = if i == 0 { data.move_to(p) } else { data.line_to(p) };
    }
    data.close()
}

/// SVG reconstruction: viewBox in compute pixels, outer size scaled to display size.
/// background rect in the fill color, then one path per primitive, all clipped to the canvas.
pub fn to_svg_document(primitives: &[Primitive], fill: [u8; 3], width: u32, height: u32, scale: f64) -> Document {
    profiling::scope!("to_svg_document");
    let canvas = || {
        Rectangle::new()
            .set("x", 0)
            .set("y", 0)
            .set("width", width)
            .set("height", height)
    };

    let defs = Definitions::new().add(ClipPath::new().set("id", "clip").add(canvas()));

    let mut shapes = Group::new().set("clip-path", "url(#clip)").add(canvas().set("fill", rgb(fill)));
    for prim in primitives {
        shapes = shapes.add(
            SvgPath::new()
                .set("d", path_data(&prim.points))
                .set("fill", rgb(prim.color))
                .set("fill-opacity", format!("{:.2}", prim.opacity)),
        );
    }

    Document::new()
        .set("viewBox", format!("0 0 {width} {height}"))
        .set("width", format!("{}", width as f64 * scale))
        .set("height", format!("{}", height as f64 * scale))
        .add(defs)
        .add(shapes)
}

pub fn save_svg(path: &Path, document: &Document) -> TraceResult<()> {
    svg::save(path, document)?;
    Ok(())
}

/// primitives as pretty JSON (same shape as [`Primitive`])
pub fn save_primitives_json(path: &Path, primitives: &[Primitive]) -> TraceResult<()> {
    let json = serde_json::to_string_pretty(primitives)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_primitives_json(path: &Path) -> TraceResult<Vec<Primitive>> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prims() -> Vec<Primitive> {
        vec![
            Primitive { points: vec![(0, 0), (4, 0), (2, 3)], color: [255, 0, 0], opacity: 0.5 },
            Primitive { points: vec![(1, 1), (5, 2), (3, 6)], color: [0, 128, 255], opacity: 0.333 },
        ]
    }

    #[test]
    fn document_has_viewbox_background_and_paths() {
        let doc = to_svg_document(&prims(), [10, 20, 30], 100, 50, 2.75).to_string();
        assert!(doc.contains(r#"viewBox="0 0 100 50""#), "{doc}");
        assert!(doc.contains(r#"width="275""#));
        assert!(doc.contains(r#"height="137.5""#));
        assert!(doc.contains("rgb(10, 20, 30)"));
        assert_eq!(doc.matches("<path").count(), 2);
        assert!(doc.contains(r#"fill-opacity="0.33""#));
        assert!(doc.contains("rgb(0, 128, 255)"));
    }

    #[test]
    fn primitives_survive_json() {
        let path = std::env::temp_dir().join(format!("polytrace-prims-{}.json", std::process::id()));
        save_primitives_json(&path, &prims()).unwrap();
        let back = load_primitives_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back, prims());
    }
}
