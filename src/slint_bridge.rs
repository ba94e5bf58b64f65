//! Slint glue, behind the `slint` feature.
//!
//! [`FlowController`] shares one [`Flow`] between UI callbacks and hands out
//! closures shaped like typical `.slint` callback signatures. [`sync_model`]
//! pushes computed lists (paint-ordered nodes, edge paths) into a `VecModel`
//! touching only the rows that changed.
//!
//! ```ignore
//! let ctrl = FlowController::new(Flow::new(FlowConfig::default()));
//! window.on_pointer_down(ctrl.pointer_down_callback());
//! window.on_pointer_move(ctrl.pointer_move_callback());
//! window.on_pointer_up(ctrl.pointer_up_callback());
//! window.on_key_pressed(ctrl.key_callback());
//!
//! let edges = Rc::new(VecModel::<EdgeData>::default());
//! window.set_edges(ModelRc::from(edges.clone()));
//! ctrl.sync_edges(&edges, |g| EdgeData { id: g.id.as_str().into(), path: g.path.path.as_str().into() });
//! ```

use crate::edges::EdgeGeometry;
use crate::flow::{Flow, Key, Modifiers, PointerEvent};
use crate::geometry::{Dimensions, Point};
use crate::hierarchy::ResolvedNode;
use crate::viewport::WheelEvent;
use slint::{Model, SharedString, VecModel};
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

/// Make `model` hold exactly `items` mapped through `constructor`.
///
/// Rows that already hold the right value are left alone so Slint only
/// re-renders what moved.
pub fn sync_model<T, P, F>(model: &VecModel<P>, items: &[T], constructor: F)
where
    P: Clone + PartialEq + 'static,
    F: Fn(&T) -> P,
{
    for (i, item) in items.iter().enumerate() {
        let row = constructor(item);
        if i < model.row_count() {
            if model.row_data(i).as_ref() != Some(&row) {
                model.set_row_data(i, row);
            }
        } else {
            model.push(row);
        }
    }
    while model.row_count() > items.len() {
        model.remove(model.row_count() - 1);
    }
}

fn key_from_text(text: &str) -> Key {
    let escape: SharedString = slint::platform::Key::Escape.into();
    let delete: SharedString = slint::platform::Key::Delete.into();
    let backspace: SharedString = slint::platform::Key::Backspace.into();
    if text == escape.as_str() {
        Key::Escape
    } else if text == delete.as_str() {
        Key::Delete
    } else if text == backspace.as_str() {
        Key::Backspace
    } else {
        Key::from_name(text)
    }
}

/// Cloneable handle to one [`Flow`], for wiring into Slint callbacks.
#[derive(Clone)]
pub struct FlowController {
    flow: Rc<RefCell<Flow>>,
}

impl FlowController {
    pub fn new(flow: Flow) -> Self {
        Self {
            flow: Rc::new(RefCell::new(flow)),
        }
    }

    pub fn flow(&self) -> Rc<RefCell<Flow>> {
        self.flow.clone()
    }

    pub fn borrow(&self) -> Ref<'_, Flow> {
        self.flow.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Flow> {
        self.flow.borrow_mut()
    }

    // === Callback factories ===

    /// `pointer-down(x, y, shift, ctrl) -> bool`
    pub fn pointer_down_callback(&self) -> impl Fn(f32, f32, bool, bool) -> bool {
        let flow = self.flow.clone();
        move |x, y, shift, ctrl| {
            let event = PointerEvent::primary(x, y).with_modifiers(Modifiers {
                shift,
                ctrl,
                meta: false,
            });
            flow.borrow_mut().pointer_down(event)
        }
    }

    /// `pointer-move(x, y)`
    pub fn pointer_move_callback(&self) -> impl Fn(f32, f32) {
        let flow = self.flow.clone();
        move |x, y| flow.borrow_mut().pointer_move(Point::new(x, y))
    }

    /// `pointer-up(x, y)`
    pub fn pointer_up_callback(&self) -> impl Fn(f32, f32) {
        let flow = self.flow.clone();
        move |x, y| flow.borrow_mut().pointer_up(Point::new(x, y))
    }

    /// `scrolled(x, y, delta-x, delta-y, ctrl) -> bool`
    pub fn wheel_callback(&self) -> impl Fn(f32, f32, f32, f32, bool) -> bool {
        let flow = self.flow.clone();
        move |x, y, delta_x, delta_y, ctrl| {
            flow.borrow_mut().wheel(WheelEvent {
                position: Point::new(x, y),
                delta_x,
                delta_y,
                ctrl,
            })
        }
    }

    /// `key-pressed(text) -> bool`
    pub fn key_callback(&self) -> impl Fn(SharedString) -> bool {
        let flow = self.flow.clone();
        move |text| flow.borrow_mut().key_down(key_from_text(text.as_str()))
    }

    /// `node-resized(id, width, height)`
    pub fn node_resized_callback(&self) -> impl Fn(SharedString, f32, f32) {
        let flow = self.flow.clone();
        move |id, width, height| {
            flow.borrow_mut()
                .node_resized(id.as_str(), Dimensions::new(width, height))
        }
    }

    /// `edge-clicked(id, multi)`
    pub fn edge_clicked_callback(&self) -> impl Fn(SharedString, bool) {
        let flow = self.flow.clone();
        move |id, multi| {
            let modifiers = if multi { Modifiers::ctrl() } else { Modifiers::NONE };
            flow.borrow_mut().edge_click(id.as_str(), modifiers)
        }
    }

    /// `viewport-resized(width, height)`
    pub fn viewport_size_callback(&self) -> impl Fn(f32, f32) {
        let flow = self.flow.clone();
        move |width, height| flow.borrow_mut().set_viewport_size(width, height)
    }

    // === Model sync ===

    /// Nodes back to front.
    pub fn sync_nodes<P, F>(&self, model: &VecModel<P>, constructor: F)
    where
        P: Clone + PartialEq + 'static,
        F: Fn(&ResolvedNode) -> P,
    {
        let flow = self.flow.borrow();
        let ordered: Vec<&Rc<ResolvedNode>> = flow.resolved_nodes().paint_order();
        sync_model(model, &ordered, |n: &&Rc<ResolvedNode>| constructor(n));
    }

    pub fn sync_edges<P, F>(&self, model: &VecModel<P>, constructor: F)
    where
        P: Clone + PartialEq + 'static,
        F: Fn(&EdgeGeometry) -> P,
    {
        let flow = self.flow.borrow();
        sync_model(model, flow.edge_geometries(), constructor);
    }
}
