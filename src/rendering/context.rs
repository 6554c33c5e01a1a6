use crate::{
    core::geo::{Point, TileCoord},
    layers::style::{Color, Icon, Style},
    Result,
};
use std::sync::Arc;

/// Unified style conversion from layer styles to per-primitive render styles
pub trait StyleConversion<T> {
    fn to_render_style(&self, opacity_multiplier: f32) -> T;
}

/// Styles for different rendering primitives
#[derive(Debug, Clone, PartialEq)]
pub struct PointRenderStyle {
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_width: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineRenderStyle {
    pub color: Color,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonRenderStyle {
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_width: f32,
}

const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
const DEFAULT_POINT_FILL: Color = Color::rgb(51, 102, 255);

impl StyleConversion<PointRenderStyle> for Style {
    fn to_render_style(&self, opacity_multiplier: f32) -> PointRenderStyle {
        PointRenderStyle {
            fill_color: self
                .fill
                .as_ref()
                .map_or(DEFAULT_POINT_FILL, |f| f.color)
                .with_opacity(opacity_multiplier),
            stroke_color: self
                .stroke
                .as_ref()
                .map_or(Color::WHITE, |s| s.color)
                .with_opacity(opacity_multiplier),
            stroke_width: self.stroke.as_ref().map_or(1.0, |s| s.width),
            radius: self.circle_radius,
        }
    }
}

impl StyleConversion<LineRenderStyle> for Style {
    fn to_render_style(&self, opacity_multiplier: f32) -> LineRenderStyle {
        LineRenderStyle {
            color: self
                .stroke
                .as_ref()
                .map_or(TRANSPARENT, |s| s.color)
                .with_opacity(opacity_multiplier),
            width: self.stroke.as_ref().map_or(0.0, |s| s.width),
        }
    }
}

impl StyleConversion<PolygonRenderStyle> for Style {
    fn to_render_style(&self, opacity_multiplier: f32) -> PolygonRenderStyle {
        PolygonRenderStyle {
            fill_color: self
                .fill
                .as_ref()
                .map_or(TRANSPARENT, |f| f.color)
                .with_opacity(opacity_multiplier),
            stroke_color: self
                .stroke
                .as_ref()
                .map_or(TRANSPARENT, |s| s.color)
                .with_opacity(opacity_multiplier),
            stroke_width: self.stroke.as_ref().map_or(0.0, |s| s.width),
        }
    }
}

/// Backend-independent frame description. Layers push commands in screen
/// pixels; the egui widget (or a test) consumes them in order.
pub struct RenderContext {
    pub width: u32,
    pub height: u32,
    pub drawing_queue: Vec<DrawCommand>,
}

/// Commands that can be issued to the render context
#[derive(Debug, Clone)]
pub enum DrawCommand {
    Point {
        position: Point,
        style: PointRenderStyle,
    },
    Line {
        points: Vec<Point>,
        style: LineRenderStyle,
    },
    Polygon {
        exterior: Vec<Point>,
        holes: Vec<Vec<Point>>,
        style: PolygonRenderStyle,
    },
    /// Image anchored at `position`; `fallback` is drawn while the image is
    /// missing or still loading
    Icon {
        position: Point,
        icon: Icon,
        opacity: f32,
        fallback: PointRenderStyle,
    },
    Tile {
        coord: TileCoord,
        data: Arc<Vec<u8>>,
        bounds: (Point, Point), // min, max screen coordinates
        opacity: f32,
    },
}

impl RenderContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            drawing_queue: Vec::new(),
        }
    }

    pub fn begin_frame(&mut self) {
        self.drawing_queue.clear();
    }

    pub fn render_point(&mut self, position: &Point, style: &PointRenderStyle) {
        self.drawing_queue.push(DrawCommand::Point {
            position: *position,
            style: style.clone(),
        });
    }

    pub fn render_line(&mut self, points: &[Point], style: &LineRenderStyle) {
        if points.len() < 2 {
            return;
        }
        self.drawing_queue.push(DrawCommand::Line {
            points: points.to_vec(),
            style: style.clone(),
        });
    }

    /// Render a polygon with exterior ring, holes, and style
    pub fn render_polygon(
        &mut self,
        exterior: &[Point],
        holes: &[Vec<Point>],
        style: &PolygonRenderStyle,
    ) {
        if exterior.len() < 3 {
            return;
        }
        self.drawing_queue.push(DrawCommand::Polygon {
            exterior: exterior.to_vec(),
            holes: holes.to_vec(),
            style: style.clone(),
        });
    }

    pub fn render_icon(
        &mut self,
        position: &Point,
        icon: &Icon,
        opacity: f32,
        fallback: &PointRenderStyle,
    ) {
        self.drawing_queue.push(DrawCommand::Icon {
            position: *position,
            icon: icon.clone(),
            opacity,
            fallback: fallback.clone(),
        });
    }

    /// Queue a tile, rejecting degenerate bounds and out-of-range opacity
    pub fn render_tile(
        &mut self,
        coord: TileCoord,
        data: Arc<Vec<u8>>,
        bounds: (Point, Point),
        opacity: f32,
    ) -> Result<()> {
        if bounds.0.x >= bounds.1.x || bounds.0.y >= bounds.1.y {
            return Err(crate::Error::Layer(format!("invalid bounds for tile {:?}", coord)).into());
        }
        if !(0.0..=1.0).contains(&opacity) {
            return Err(crate::Error::Layer("opacity must be between 0.0 and 1.0".into()).into());
        }

        self.drawing_queue.push(DrawCommand::Tile {
            coord,
            data,
            bounds,
            opacity,
        });
        Ok(())
    }

    pub fn get_drawing_queue(&self) -> &[DrawCommand] {
        &self.drawing_queue
    }
}
