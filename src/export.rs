//! Coordinate export of committed positions.

use serde::Serialize;

use crate::error::ExportError;
use crate::geometry::{self, Shape, VertexLabel};
use crate::position::{Position, PositionId};
use crate::transform::{CoordinateOrigin, ImageDimensions};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportPoint {
    pub label: VertexLabel,
    pub x: i64,
    pub y: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedPosition {
    pub id: PositionId,
    pub shape: Shape,
    pub coordinates: Vec<ExportPoint>,
    /// Circle radius; a length, so never origin-transformed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

fn round(v: f64) -> i64 {
    v.round() as i64
}

fn export_one(
    position: &Position,
    origin: CoordinateOrigin,
    dims: ImageDimensions,
) -> ExportedPosition {
    let shape = position.shape();
    let coordinates = geometry::vertices_of(&position.bounds, shape)
        .into_iter()
        // the radius anchor is re-expressed as a scalar below
        .filter(|v| v.label != VertexLabel::Radius)
        .map(|v| {
            let p = origin.to_origin(v.point, dims);
            ExportPoint {
                label: v.label,
                x: round(p.x),
                y: round(p.y),
            }
        })
        .collect();
    let radius = match shape {
        Shape::Circle => Some(round(geometry::circle_radius(&position.bounds))),
        Shape::Rectangle | Shape::Trapezoid => None,
    };
    ExportedPosition {
        id: position.id,
        shape,
        coordinates,
        radius,
        file_name: position.overlay_file_name().map(str::to_owned),
    }
}

/// Exports every position, each vertex transformed into `origin` on its own.
pub fn export_positions<'a>(
    positions: impl IntoIterator<Item = &'a Position>,
    origin: CoordinateOrigin,
    dims: ImageDimensions,
) -> Result<Vec<ExportedPosition>, ExportError> {
    let exported: Vec<_> = positions
        .into_iter()
        .map(|p| export_one(p, origin, dims))
        .collect();
    if exported.is_empty() {
        return Err(ExportError::NoPositions);
    }
    Ok(exported)
}

pub fn to_json(exported: &[ExportedPosition]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(exported)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::position::PositionSet;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    const DIMS: ImageDimensions = ImageDimensions::new(100.0, 50.0);

    fn coords(e: &ExportedPosition) -> Vec<(i64, i64)> {
        e.coordinates.iter().map(|c| (c.x, c.y)).collect()
    }

    #[test]
    fn test_empty_export_is_rejected() {
        let set = PositionSet::default();
        assert_matches!(
            export_positions(&set, CoordinateOrigin::TopLeft, DIMS),
            Err(ExportError::NoPositions)
        );
    }

    #[test]
    fn test_circle_exports_center_and_scalar_radius() {
        let mut set = PositionSet::default();
        set.push(Position::new(BoundingBox::new(0.0, 0.0, 10.0, 20.0), Shape::Circle));
        let out = export_positions(&set, CoordinateOrigin::TopLeft, DIMS).unwrap();
        assert_eq!(coords(&out[0]), vec![(5, 10)]);
        assert_eq!(out[0].coordinates[0].label, VertexLabel::Center);
        assert_eq!(out[0].radius, Some(10));
    }

    #[test]
    fn test_circle_radius_ignores_origin() {
        let mut set = PositionSet::default();
        set.push(Position::new(BoundingBox::new(0.0, 0.0, 10.0, 20.0), Shape::Circle));
        let out = export_positions(&set, CoordinateOrigin::BottomRight, DIMS).unwrap();
        assert_eq!(coords(&out[0]), vec![(95, 40)]);
        assert_eq!(out[0].radius, Some(10));
    }

    #[test]
    fn test_trapezoid_exports_four_labeled_corners() {
        let mut set = PositionSet::default();
        set.push(Position::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), Shape::Trapezoid));
        let out = export_positions(&set, CoordinateOrigin::TopLeft, DIMS).unwrap();
        assert_eq!(coords(&out[0]), vec![(1, 0), (9, 0), (10, 10), (0, 10)]);
        assert_eq!(out[0].radius, None);
    }

    #[test]
    fn test_points_are_transformed_individually() {
        let mut set = PositionSet::default();
        set.push(Position::new(BoundingBox::new(10.0, 5.0, 20.0, 10.0), Shape::Rectangle));
        let out = export_positions(&set, CoordinateOrigin::BottomLeft, DIMS).unwrap();
        let labels: Vec<_> = out[0].coordinates.iter().map(|c| c.label).collect();
        assert_eq!(
            labels,
            vec![
                VertexLabel::TopLeft,
                VertexLabel::TopRight,
                VertexLabel::BottomRight,
                VertexLabel::BottomLeft
            ]
        );
        assert_eq!(coords(&out[0]), vec![(10, 45), (30, 45), (30, 35), (10, 35)]);
    }

    #[test]
    fn test_values_are_rounded_at_export_only() {
        let mut set = PositionSet::default();
        set.push(Position::new(BoundingBox::new(1.4, 2.6, 10.2, 10.2), Shape::Rectangle));
        let out = export_positions(&set, CoordinateOrigin::TopLeft, DIMS).unwrap();
        assert_eq!(coords(&out[0])[0], (1, 3));
        assert_eq!(set.iter().next().unwrap().bounds.x, 1.4);
    }

    #[test]
    fn test_json_shape_and_file_name() {
        let mut set = PositionSet::default();
        let id = set.push(Position::new(BoundingBox::new(0.0, 0.0, 10.0, 20.0), Shape::Circle));
        set.set_overlay(id, Arc::from(vec![0u8]), "pin.png".into());
        let out = export_positions(&set, CoordinateOrigin::TopLeft, DIMS).unwrap();
        let json: serde_json::Value = serde_json::from_str(&to_json(&out).unwrap()).unwrap();
        assert_eq!(json[0]["shape"], "CIRCLE");
        assert_eq!(json[0]["radius"], 10);
        assert_eq!(json[0]["fileName"], "pin.png");
        assert_eq!(json[0]["coordinates"][0]["label"], "Center");
        assert_eq!(json[0]["id"], id.to_string());
    }
}
