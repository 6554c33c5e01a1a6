//! egui map widget: paints a frame of [`DrawCommand`]s and turns egui
//! pointer input into [`InputEvent`]s for the interaction handler.

use crate::{
    core::{
        constants::POPUP_OFFSET,
        geo::{Point, TileCoord},
        map::Map,
    },
    data::loader::SourceLocation,
    input::{InputEvent, MouseButton},
    interaction::InteractionHandler,
    layers::style::Icon,
    prelude::HashMap,
    rendering::context::{
        DrawCommand, LineRenderStyle, PointRenderStyle, PolygonRenderStyle, RenderContext,
    },
    ui::popup::{show_popup, PopupStyle},
};
use egui::{
    epaint::Mesh, Color32, ColorImage, Pos2, Rect, Response, Sense, Shape, Stroke, TextureHandle,
    TextureOptions, Ui, Vec2,
};
use geo::TriangulateEarcut;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Scroll distance in points that counts as one zoom step
const SCROLL_STEP: f32 = 50.0;

const TILE_TEXTURES: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Interactive map view. Owns GPU textures only; the map and interaction
/// state are passed in every frame.
pub struct MapView {
    icon_root: PathBuf,
    tile_textures: LruCache<TileCoord, TextureHandle>,
    /// `None` marks an icon that failed to load
    icon_textures: HashMap<String, Option<TextureHandle>>,
    /// Icons decoded this frame, reported to the map for hit testing
    decoded_icons: Vec<(String, [f32; 2])>,
    popup_style: PopupStyle,
    scroll_accumulator: f32,
    last_pointer: Option<Pos2>,
    last_size: Option<Vec2>,
    background: Color32,
}

impl MapView {
    /// `icon_root` is where relative icon paths are read from
    pub fn new(icon_root: impl Into<PathBuf>) -> Self {
        Self {
            icon_root: icon_root.into(),
            tile_textures: LruCache::new(TILE_TEXTURES),
            icon_textures: HashMap::default(),
            decoded_icons: Vec::new(),
            popup_style: PopupStyle::default(),
            scroll_accumulator: 0.0,
            last_pointer: None,
            last_size: None,
            background: Color32::from_rgb(230, 230, 230),
        }
    }

    pub fn with_popup_style(mut self, style: PopupStyle) -> Self {
        self.popup_style = style;
        self
    }

    pub fn show(
        &mut self,
        ui: &mut Ui,
        map: &mut Map,
        interaction: &mut InteractionHandler,
    ) -> Response {
        let desired_size = ui.available_size();
        let (rect, response) = ui.allocate_exact_size(desired_size, Sense::click_and_drag());

        for event in self.collect_input(ui, &response, rect) {
            if let Err(e) = interaction.handle(map, &event) {
                log::warn!("input {:?} failed: {}", event, e);
            }
        }

        if map.poll_sources() > 0 {
            ui.ctx().request_repaint();
        }

        let mut render_ctx = RenderContext::new(rect.width() as u32, rect.height() as u32);
        if let Err(e) = map.render(&mut render_ctx) {
            log::warn!("map render failed: {}", e);
        }
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, self.background);
        for cmd in render_ctx.get_drawing_queue() {
            self.paint(ui, &painter, rect, cmd);
        }
        for (src, size) in self.decoded_icons.drain(..) {
            log::debug!("icon '{}' is {}x{} px", src, size[0], size[1]);
            map.set_icon_size(&src, size);
        }

        if let Some(position) = interaction.popup.overlay().position() {
            let anchor = map.viewport().lat_lng_to_pixel(&position);
            let screen = to_screen(rect, &anchor) + Vec2::from(POPUP_OFFSET);
            if let Some(content) = interaction.popup.overlay().content() {
                let popup_id = response.id.with("popup");
                let closed = rect.contains(screen)
                    && show_popup(ui.ctx(), popup_id, screen, content, &self.popup_style);
                if closed {
                    interaction.popup.close();
                }
            }
        }

        if map.sources_pending() > 0 {
            ui.ctx().request_repaint_after(Duration::from_millis(100));
        }
        // tiles arrive from worker threads
        ui.ctx().request_repaint_after(Duration::from_millis(250));

        response
    }

    fn collect_input(&mut self, ui: &Ui, response: &Response, rect: Rect) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let local =
            |pos: Pos2| Point::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64);

        if self.last_size != Some(rect.size()) {
            self.last_size = Some(rect.size());
            events.push(InputEvent::Resize {
                size: Point::new(rect.width() as f64, rect.height() as f64),
            });
        }

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                events.push(InputEvent::DragStart { position: local(pos) });
            }
        }
        if response.dragged() {
            let delta = response.drag_delta();
            if delta != Vec2::ZERO {
                events.push(InputEvent::Drag {
                    delta: Point::new(delta.x as f64, delta.y as f64),
                });
            }
        }
        if response.drag_released() {
            events.push(InputEvent::DragEnd);
        }

        let hover = response.hover_pos();
        if hover != self.last_pointer {
            self.last_pointer = hover;
            if let Some(pos) = hover {
                events.push(InputEvent::PointerMove {
                    position: local(pos),
                    dragging: response.dragged(),
                });
            }
        }

        if let Some(pos) = response.interact_pointer_pos() {
            if response.double_clicked() {
                events.push(InputEvent::DoubleClick { position: local(pos) });
            } else if response.clicked() {
                events.push(InputEvent::Click {
                    position: local(pos),
                    button: MouseButton::Left,
                });
            }
        }

        if let Some(pos) = hover {
            self.scroll_accumulator += ui.input(|i| i.smooth_scroll_delta.y);
            if self.scroll_accumulator.abs() >= SCROLL_STEP {
                events.push(InputEvent::Scroll {
                    delta: self.scroll_accumulator.signum() as f64,
                    position: local(pos),
                });
                self.scroll_accumulator = 0.0;
            }
        } else {
            self.scroll_accumulator = 0.0;
        }

        events
    }

    fn paint(&mut self, ui: &Ui, painter: &egui::Painter, rect: Rect, cmd: &DrawCommand) {
        match cmd {
            DrawCommand::Tile {
                coord,
                data,
                bounds,
                opacity,
            } => {
                let Some(texture) = self.tile_texture(ui.ctx(), *coord, data) else {
                    return;
                };
                let tile_rect =
                    Rect::from_two_pos(to_screen(rect, &bounds.0), to_screen(rect, &bounds.1));
                painter.image(
                    texture.id(),
                    tile_rect,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE.gamma_multiply(*opacity),
                );
            }
            DrawCommand::Polygon {
                exterior,
                holes,
                style,
            } => paint_polygon(painter, rect, exterior, holes, style),
            DrawCommand::Line { points, style } => paint_line(painter, rect, points, style),
            DrawCommand::Point { position, style } => {
                paint_circle(painter, to_screen(rect, position), style)
            }
            DrawCommand::Icon {
                position,
                icon,
                opacity,
                fallback,
            } => {
                let anchor = to_screen(rect, position);
                match self.icon_texture(ui.ctx(), icon) {
                    Some(texture) => {
                        let size = texture.size_vec2() * icon.scale;
                        let min =
                            anchor - Vec2::new(size.x * icon.anchor[0], size.y * icon.anchor[1]);
                        painter.image(
                            texture.id(),
                            Rect::from_min_size(min, size),
                            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                            Color32::WHITE.gamma_multiply(*opacity),
                        );
                    }
                    None => paint_circle(painter, anchor, fallback),
                }
            }
        }
    }

    fn tile_texture(
        &mut self,
        ctx: &egui::Context,
        coord: TileCoord,
        data: &[u8],
    ) -> Option<TextureHandle> {
        if let Some(texture) = self.tile_textures.get(&coord) {
            return Some(texture.clone());
        }
        let image = decode_image(data)?;
        let texture = ctx.load_texture(
            format!("tile_{}_{}_{}", coord.z, coord.x, coord.y),
            image,
            TextureOptions::LINEAR,
        );
        self.tile_textures.put(coord, texture.clone());
        Some(texture)
    }

    fn icon_texture(&mut self, ctx: &egui::Context, icon: &Icon) -> Option<TextureHandle> {
        if let Some(cached) = self.icon_textures.get(&icon.src) {
            return cached.clone();
        }
        let location = SourceLocation::resolve(&icon.src, &self.icon_root);
        let texture = match location.read_bytes() {
            Ok(bytes) => decode_image(&bytes)
                .map(|image| ctx.load_texture(icon.src.clone(), image, TextureOptions::LINEAR)),
            Err(e) => {
                log::warn!("icon '{}' unavailable, drawing circles: {}", icon.src, e);
                None
            }
        };
        if let Some(texture) = &texture {
            let size = texture.size_vec2();
            self.decoded_icons.push((icon.src.clone(), [size.x, size.y]));
        }
        self.icon_textures.insert(icon.src.clone(), texture.clone());
        texture
    }
}

fn to_screen(rect: Rect, point: &Point) -> Pos2 {
    Pos2::new(rect.min.x + point.x as f32, rect.min.y + point.y as f32)
}

fn decode_image(bytes: &[u8]) -> Option<ColorImage> {
    let image = image::load_from_memory(bytes).ok()?.to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}

fn paint_circle(painter: &egui::Painter, center: Pos2, style: &PointRenderStyle) {
    painter.circle(
        center,
        style.radius,
        Color32::from(style.fill_color),
        Stroke::new(style.stroke_width, Color32::from(style.stroke_color)),
    );
}

fn paint_line(painter: &egui::Painter, rect: Rect, points: &[Point], style: &LineRenderStyle) {
    let points: Vec<Pos2> = points.iter().map(|p| to_screen(rect, p)).collect();
    painter.add(Shape::line(
        points,
        Stroke::new(style.width, Color32::from(style.color)),
    ));
}

fn paint_polygon(
    painter: &egui::Painter,
    rect: Rect,
    exterior: &[Point],
    holes: &[Vec<Point>],
    style: &PolygonRenderStyle,
) {
    let fill = Color32::from(style.fill_color);
    if fill.a() > 0 {
        if let Some(mesh) = fill_mesh(rect, exterior, holes, fill) {
            painter.add(Shape::mesh(mesh));
        }
    }

    if style.stroke_width > 0.0 {
        let stroke = Stroke::new(style.stroke_width, Color32::from(style.stroke_color));
        for ring in std::iter::once(exterior).chain(holes.iter().map(Vec::as_slice)) {
            let points: Vec<Pos2> = ring.iter().map(|p| to_screen(rect, p)).collect();
            painter.add(Shape::closed_line(points, stroke));
        }
    }
}

/// Triangulated fill, so concave rings and holes render correctly
fn fill_mesh(rect: Rect, exterior: &[Point], holes: &[Vec<Point>], color: Color32) -> Option<Mesh> {
    let ring = |points: &[Point]| -> geo::LineString<f64> {
        points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>().into()
    };
    let polygon = geo::Polygon::new(ring(exterior), holes.iter().map(|h| ring(h)).collect());
    let triangulation = polygon.earcut_triangles_raw();
    if triangulation.triangle_indices.is_empty() {
        return None;
    }

    let mut mesh = Mesh::default();
    for xy in triangulation.vertices.chunks_exact(2) {
        let pos = Pos2::new(rect.min.x + xy[0] as f32, rect.min.y + xy[1] as f32);
        mesh.colored_vertex(pos, color);
    }
    for triangle in triangulation.triangle_indices.chunks_exact(3) {
        mesh.add_triangle(triangle[0] as u32, triangle[1] as u32, triangle[2] as u32);
    }
    Some(mesh)
}
