//! Building controls from skin XML

use super::{
    Animation, ButtonControl, Control, ControlTree, GroupControl, ImageControl, LabelControl, ListControl,
    RadioButtonControl,
};
use crate::foundation::collections::ControlKey;
use crate::foundation::math::Rect;
use crate::info::Condition;
use crate::messages::Direction;
use crate::skin::{SkinError, XmlElement};

const DEFAULT_ITEM_HEIGHT: f32 = 40.0;

/// Turns `<control type="...">` elements into controls
pub trait ControlFactory: Send + Sync {
    /// Build one control. Nested `<control>` children of groups are added
    /// by [`populate`], not here.
    fn create(&self, element: &XmlElement) -> Result<Box<dyn Control>, SkinError>;
}

/// Factory for the built-in control types
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultControlFactory;

fn geometry(element: &XmlElement) -> Result<Rect, SkinError> {
    let coord = |primary: &str, alias: &str| -> Result<f32, SkinError> {
        Ok(element
            .child_value::<f32>(primary)?
            .or(element.child_value::<f32>(alias)?)
            .unwrap_or(0.0))
    };
    Ok(Rect::new(
        coord("posx", "left")?,
        coord("posy", "top")?,
        element.child_value("width")?.unwrap_or(0.0),
        element.child_value("height")?.unwrap_or(0.0),
    ))
}

/// Parse a `<visible>`-style condition; a broken expression is logged and
/// treated as always true
pub(crate) fn lenient_condition(text: &str) -> Option<Condition> {
    match Condition::parse(text) {
        Ok(condition) => Some(condition),
        Err(err) => {
            log::error!("Invalid condition '{}': {}", text, err);
            None
        }
    }
}

fn text_of<'a>(element: &'a XmlElement, name: &str) -> &'a str {
    element.child_text(name).map_or("", str::trim)
}

impl DefaultControlFactory {
    /// Apply the properties every control type shares
    fn configure(control: &mut dyn Control, element: &XmlElement) {
        let base = control.base_mut();
        if let Some(text) = element.child_text("visible") {
            base.set_visible_condition(lenient_condition(text));
        }
        for (direction, name) in [
            (Direction::Up, "onup"),
            (Direction::Down, "ondown"),
            (Direction::Left, "onleft"),
            (Direction::Right, "onright"),
        ] {
            // non-numeric targets are builtin actions, which are not supported
            let target = element.child_text(name).and_then(|text| text.trim().parse().ok());
            base.set_navigation(direction, target);
        }
        for anim in element.children_named("animation") {
            match Animation::parse(anim) {
                Ok(parsed) => parsed.into_iter().for_each(|a| base.add_animation(a)),
                Err(err) => log::error!("Control {}: skipping animation: {}", base.id(), err),
            }
        }
    }
}

impl ControlFactory for DefaultControlFactory {
    fn create(&self, element: &XmlElement) -> Result<Box<dyn Control>, SkinError> {
        let kind = element.attr("type").unwrap_or_default().trim().to_lowercase();
        let id = element.attr_value::<i32>("id")?.unwrap_or(0);
        let rect = geometry(element)?;

        let mut control: Box<dyn Control> = match kind.as_str() {
            "image" => Box::new(ImageControl::new(id, rect, text_of(element, "texture"))),
            "label" => Box::new(LabelControl::new(id, rect, text_of(element, "label"))),
            "button" => Box::new(
                ButtonControl::new(id, rect)
                    .with_textures(text_of(element, "texturefocus"), text_of(element, "texturenofocus"))
                    .with_label(text_of(element, "label")),
            ),
            "radiobutton" => {
                let button = ButtonControl::new(id, rect)
                    .with_textures(text_of(element, "texturefocus"), text_of(element, "texturenofocus"))
                    .with_label(text_of(element, "label"));
                Box::new(
                    RadioButtonControl::new(button)
                        .with_radio_textures(text_of(element, "textureradioon"), text_of(element, "textureradiooff")),
                )
            }
            "group" => {
                let mut group = GroupControl::new(id, rect);
                group.set_default_control(element.child_value("defaultcontrol")?);
                Box::new(group)
            }
            "list" => {
                let item_height = element.child_value("itemheight")?.unwrap_or(DEFAULT_ITEM_HEIGHT);
                Box::new(
                    ListControl::new(id, rect, item_height)
                        .with_textures(text_of(element, "texturefocus"), text_of(element, "texturenofocus")),
                )
            }
            _ => return Err(SkinError::UnknownControlType(kind)),
        };

        Self::configure(control.as_mut(), element);
        Ok(control)
    }
}

/// Add every `<control>` child of `container` under `parent`, descending
/// into groups. Controls that fail to build are logged and skipped.
///
/// Returns the number of controls added.
pub fn populate(
    factory: &dyn ControlFactory,
    tree: &mut ControlTree,
    parent: ControlKey,
    container: &XmlElement,
) -> usize {
    let mut added = 0;
    for element in container.children_named("control") {
        let control = match factory.create(element) {
            Ok(control) => control,
            Err(err) => {
                log::error!("Skipping control: {}", err);
                continue;
            }
        };
        let is_group = control.as_any().is::<GroupControl>();
        let Some(key) = tree.add(parent, control) else {
            continue;
        };
        added += 1;
        if is_group {
            added += populate(factory, tree, key, element);
        }
    }
    added
}
