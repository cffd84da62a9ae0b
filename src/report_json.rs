//! Purpose: Shared JSON serializers for CLI reports.
//! Exports: `lens_space_json`, `manifold_json`, `torus_json`, `skeleton_json`.
//! Role: Keep report envelopes consistent across `build`, `torus`, `name` and `recognize`.
//! Invariants: Stable key names; tetrahedron indices refer to the reported triangulation.

use layerlens::api::{
    LayeredLensSpace, LayeredSolidTorus, LensSpace, LensSpaceQueries, Skeleton, Triangulation,
};
use serde_json::{Map, Value, json};

pub(crate) fn manifold_json(lens: &LensSpace) -> Value {
    json!({
        "p": lens.p(),
        "q": lens.q(),
        "name": lens.name(),
        "tex_name": lens.tex_name(),
        "homology_h1": lens.homology_h1(),
    })
}

pub(crate) fn lens_space_json(lens: &LayeredLensSpace) -> Value {
    let mut map = Map::new();
    map.insert("p".to_string(), json!(lens.p()));
    map.insert("q".to_string(), json!(lens.q()));
    map.insert("name".to_string(), json!(lens.name()));
    map.insert("homology_h1".to_string(), json!(lens.homology_h1()));
    map.insert("snapped".to_string(), json!(lens.is_snapped()));
    map.insert("twisted".to_string(), json!(lens.is_twisted()));
    map.insert(
        "mobius_boundary_group".to_string(),
        json!(lens.mobius_boundary_group()),
    );
    if let Ok(torus) = lens.torus() {
        map.insert("torus".to_string(), torus_json(torus));
    }
    Value::Object(map)
}

pub(crate) fn torus_json(torus: &LayeredSolidTorus) -> Value {
    let groups = (0..3)
        .map(|group| {
            let edges: Vec<usize> = (0..2).filter_map(|i| torus.top_edge(group, i)).collect();
            json!({
                "group": group,
                "cuts": torus.meridinal_cuts(group),
                "edges": edges,
            })
        })
        .collect::<Vec<_>>();
    json!({
        "size": torus.size(),
        "base": torus.base(),
        "top_level": torus.top_level(),
        "tetrahedra": torus.tetrahedra(),
        "top_faces": torus.top_faces(),
        "cuts": torus.cuts(),
        "hinge": torus.hinge(),
        "groups": groups,
    })
}

pub(crate) fn skeleton_json(tri: &Triangulation, skeleton: &Skeleton) -> Value {
    let components = skeleton
        .components()
        .iter()
        .map(|component| {
            json!({
                "tetrahedra": component.tetrahedra.len(),
                "closed": component.closed,
                "orientable": component.orientable,
                "valid": component.valid,
                "vertices": component.vertices,
                "edges": component.edges,
            })
        })
        .collect::<Vec<_>>();
    json!({
        "tetrahedra": tri.size(),
        "vertices": skeleton.num_vertices(),
        "edges": skeleton.num_edges(),
        "closed": tri.is_closed(),
        "connected": skeleton.is_connected(),
        "orientable": skeleton.is_orientable(),
        "valid": skeleton.is_valid(),
        "components": components,
    })
}
