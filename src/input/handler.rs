use crate::{
    core::{constants::MAX_ZOOM, constants::MIN_ZOOM, geo::Point},
    input::events::{InputEvent, MapEvent},
    prelude::HashMap,
};
use std::collections::VecDeque;

/// Viewport change requested by an input event
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Move the content by `delta` pixels
    Pan { delta: Point },
    /// Zoom to `level`, keeping `focus_point` fixed on screen
    Zoom {
        level: f64,
        focus_point: Option<Point>,
    },
    Resize { size: Point },
    StartDrag,
    EndDrag,
}

/// Event listener callback type
pub type EventCallback = Box<dyn Fn(&MapEvent) + Send + Sync>;

/// Event management system for the map
#[derive(Default)]
pub struct EventManager {
    /// Event listeners by event type
    listeners: HashMap<String, Vec<EventCallback>>,
    event_queue: VecDeque<MapEvent>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event listener
    pub fn on<F>(&mut self, event_type: &str, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.listeners
            .entry(event_type.to_string())
            .or_default()
            .push(Box::new(callback));
    }

    pub fn emit(&mut self, event: MapEvent) {
        self.event_queue.push_back(event);
    }

    /// Runs listeners for every queued event and returns the events
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        let events: Vec<_> = self.event_queue.drain(..).collect();

        for event in &events {
            if let Some(callbacks) = self.listeners.get(event.event_type()) {
                for callback in callbacks {
                    callback(event);
                }
            }
        }

        events
    }

    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }
}

/// Turns navigation input into viewport actions
pub struct InputHandler {
    pub enabled: bool,
    pub zoom_on_wheel: bool,
    pub zoom_on_double_click: bool,
    pub pan_on_drag: bool,
    dragging: bool,
}

impl InputHandler {
    pub fn new() -> Self {
        Self {
            enabled: true,
            zoom_on_wheel: true,
            zoom_on_double_click: true,
            pan_on_drag: true,
            dragging: false,
        }
    }

    /// Whether a drag gesture is in progress
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn handle_event(&mut self, event: &InputEvent, current_zoom: f64) -> Vec<Action> {
        if !self.enabled {
            return vec![];
        }

        let mut actions = vec![];

        match event {
            InputEvent::DragStart { .. } => {
                if self.pan_on_drag {
                    self.dragging = true;
                    actions.push(Action::StartDrag);
                }
            }
            InputEvent::Drag { delta } => {
                if self.pan_on_drag && self.dragging {
                    actions.push(Action::Pan { delta: *delta });
                }
            }
            InputEvent::DragEnd => {
                if self.dragging {
                    self.dragging = false;
                    actions.push(Action::EndDrag);
                }
            }
            InputEvent::Scroll { delta, position } => {
                if self.zoom_on_wheel && *delta != 0.0 {
                    let step = if *delta > 0.0 { 1.0 } else { -1.0 };
                    actions.push(Action::Zoom {
                        level: (current_zoom.round() + step).clamp(MIN_ZOOM, MAX_ZOOM),
                        focus_point: Some(*position),
                    });
                }
            }
            InputEvent::DoubleClick { position } => {
                if self.zoom_on_double_click {
                    actions.push(Action::Zoom {
                        level: (current_zoom.round() + 1.0).clamp(MIN_ZOOM, MAX_ZOOM),
                        focus_point: Some(*position),
                    });
                }
            }
            InputEvent::Resize { size } => actions.push(Action::Resize { size: *size }),
            // Feature interaction, not navigation
            InputEvent::Click { .. } | InputEvent::PointerMove { .. } => {}
        }

        actions
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}
