use tracing::{debug, warn};

use pcbkit_core::{Circle, Primitive, Shape};

use super::{DrillSettings, OffsetPass, OperationKind};
use crate::error::CamToolResult;

/// Drill hits: one circle per hole position, no offsetting.
///
/// Circles keep their centre and radius; any other shape drills at the
/// centre of its bounding box with the tool radius.
pub fn drill_passes(holes: &[Primitive], settings: &DrillSettings) -> CamToolResult<Vec<OffsetPass>> {
    settings.validate()?;
    let primitives: Vec<Primitive> = holes
        .iter()
        .filter_map(|hole| {
            let circle = match &hole.shape {
                Shape::Circle(c) => *c,
                other => {
                    let bbox = other.bounding_box();
                    if bbox.is_empty() {
                        warn!(kind = other.kind_name(), "Drill hole without geometry; skipping");
                        return None;
                    }
                    Circle::new(bbox.center(), settings.tool_diameter / 2.0)
                }
            };
            Some(Primitive::new(Shape::Circle(circle), hole.properties.clone()))
        })
        .collect();
    debug!(hits = primitives.len(), "Drill pass");

    Ok(vec![OffsetPass {
        pass_index: 0,
        distance: 0.0,
        combined: false,
        kind: OperationKind::Drill,
        tool_diameter: settings.tool_diameter,
        primitives,
    }])
}
