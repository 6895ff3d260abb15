//! Control and window animations
//!
//! An [`Animation`] is a list of effects (fade, slide, zoom) triggered by an
//! [`AnimationType`]. Each frame [`Animation::animate`] advances the state
//! machine and [`Animation::render_transform`] yields the transform to
//! compose onto the control.

use std::f32::consts::PI;

use crate::foundation::math::{Point, TransformMatrix};
use crate::info::{Condition, ConditionContext};
use crate::skin::{SkinError, XmlElement};

/// What triggers an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationType {
    /// Window is being opened
    WindowOpen,
    /// Window is being closed
    WindowClose,
    /// Control becomes visible
    Visible,
    /// Control becomes hidden
    Hidden,
    /// Control gains focus
    Focus,
    /// Control loses focus
    Unfocus,
    /// Runs while its condition holds
    Conditional,
}

impl AnimationType {
    /// The opposite trigger, if any
    pub fn reverse(self) -> Option<Self> {
        match self {
            Self::WindowOpen => Some(Self::WindowClose),
            Self::WindowClose => Some(Self::WindowOpen),
            Self::Visible => Some(Self::Hidden),
            Self::Hidden => Some(Self::Visible),
            Self::Focus => Some(Self::Unfocus),
            Self::Unfocus => Some(Self::Focus),
            Self::Conditional => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "windowopen" => Some(Self::WindowOpen),
            "windowclose" => Some(Self::WindowClose),
            "visible" => Some(Self::Visible),
            "hidden" => Some(Self::Hidden),
            "focus" => Some(Self::Focus),
            "unfocus" => Some(Self::Unfocus),
            "conditional" => Some(Self::Conditional),
            _ => None,
        }
    }
}

/// Progress of an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationState {
    /// Not started
    #[default]
    None,
    /// Started but inside its delay
    Delayed,
    /// Running
    InProcess,
    /// Finished; the end state stays applied
    Applied,
}

/// Direction an animation runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationProcess {
    /// Idle
    #[default]
    None,
    /// Forwards
    Normal,
    /// Backwards from the current amount
    Reverse,
}

/// Interpolation curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tween {
    /// Constant speed
    #[default]
    Linear,
    /// t²
    Quadratic,
    /// t³
    Cubic,
    /// Quarter sine wave
    Sine,
    /// Overshoots slightly before settling
    Back,
}

/// Which end of the curve the tween applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// Slow start
    In,
    /// Slow finish
    #[default]
    Out,
    /// Slow start and finish
    InOut,
}

impl Tween {
    fn ease_in(self, t: f32) -> f32 {
        const BACK: f32 = 1.701_58;
        match self {
            Self::Linear => t,
            Self::Quadratic => t * t,
            Self::Cubic => t * t * t,
            Self::Sine => 1.0 - (t * PI * 0.5).cos(),
            Self::Back => t * t * ((BACK + 1.0) * t - BACK),
        }
    }

    /// Map linear progress `t` in 0..=1 through the curve
    pub fn apply(self, easing: Easing, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match easing {
            Easing::In => self.ease_in(t),
            Easing::Out => 1.0 - self.ease_in(1.0 - t),
            Easing::InOut => {
                if t < 0.5 {
                    self.ease_in(t * 2.0) * 0.5
                } else {
                    1.0 - self.ease_in((1.0 - t) * 2.0) * 0.5
                }
            }
        }
    }
}

/// Visual change produced by an effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationEffect {
    /// Alpha from `start` to `end` (0..=1)
    Fade {
        /// Alpha at the start
        start: f32,
        /// Alpha at the end
        end: f32,
    },
    /// Offset from `start` to `end`
    Slide {
        /// Offset at the start
        start: Point,
        /// Offset at the end
        end: Point,
    },
    /// Scale from `start` to `end` (1.0 = 100%) about `center`, or the control centre
    Zoom {
        /// Scale at the start
        start: (f32, f32),
        /// Scale at the end
        end: (f32, f32),
        /// Fixed zoom centre
        center: Option<Point>,
    },
}

/// One timed effect inside an animation
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSpec {
    /// What changes
    pub effect: AnimationEffect,
    /// Delay before the effect starts, relative to the animation
    pub delay_ms: u32,
    /// Effect duration
    pub length_ms: u32,
    /// Curve
    pub tween: Tween,
    /// Curve end
    pub easing: Easing,
}

impl EffectSpec {
    fn transform_at(&self, time_ms: u32, center: Point) -> TransformMatrix {
        let t = if time_ms < self.delay_ms {
            0.0
        } else if self.length_ms == 0 || time_ms >= self.delay_ms.saturating_add(self.length_ms) {
            1.0
        } else {
            (time_ms - self.delay_ms) as f32 / self.length_ms as f32
        };
        let offset = self.tween.apply(self.easing, t);
        let lerp = |a: f32, b: f32| a + (b - a) * offset;

        match self.effect {
            AnimationEffect::Fade { start, end } => TransformMatrix::fade(lerp(start, end)),
            AnimationEffect::Slide { start, end } => {
                TransformMatrix::translation(lerp(start.x, end.x), lerp(start.y, end.y))
            }
            AnimationEffect::Zoom { start, end, center: fixed } => TransformMatrix::scale_about(
                fixed.unwrap_or(center),
                lerp(start.0, end.0),
                lerp(start.1, end.1),
            ),
        }
    }
}

/// A triggered, timed set of effects
#[derive(Debug, Clone)]
pub struct Animation {
    kind: AnimationType,
    effects: Vec<EffectSpec>,
    condition: Option<Condition>,
    reversible: bool,
    delay_ms: u32,
    length_ms: u32,

    state: AnimationState,
    process: AnimationProcess,
    queued: AnimationProcess,
    start_ms: u32,
    amount: f32,
    last_condition: bool,
    transform: TransformMatrix,
}

impl Animation {
    /// Create an animation from its effects
    pub fn new(kind: AnimationType, effects: Vec<EffectSpec>) -> Self {
        let delay_ms = effects.iter().map(|e| e.delay_ms).min().unwrap_or(0);
        let end_ms = effects.iter().map(|e| e.delay_ms.saturating_add(e.length_ms)).max().unwrap_or(0);
        Self {
            kind,
            effects,
            condition: None,
            reversible: true,
            delay_ms,
            length_ms: end_ms - delay_ms,
            state: AnimationState::None,
            process: AnimationProcess::None,
            queued: AnimationProcess::None,
            start_ms: 0,
            amount: 0.0,
            last_condition: false,
            transform: TransformMatrix::identity(),
        }
    }

    /// Single fade effect, the common skin case
    pub fn fade(kind: AnimationType, start: f32, end: f32, length_ms: u32) -> Self {
        Self::new(
            kind,
            vec![EffectSpec {
                effect: AnimationEffect::Fade { start, end },
                delay_ms: 0,
                length_ms,
                tween: Tween::Linear,
                easing: Easing::Out,
            }],
        )
    }

    /// Attach a condition
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Whether the animation may run backwards when its trigger is undone
    #[must_use]
    pub fn with_reversible(mut self, reversible: bool) -> Self {
        self.reversible = reversible;
        self
    }

    /// Trigger type
    pub fn kind(&self) -> AnimationType {
        self.kind
    }

    /// Current state
    pub fn state(&self) -> AnimationState {
        self.state
    }

    /// Current process
    pub fn process(&self) -> AnimationProcess {
        self.process
    }

    /// Queued process, applied on the next [`Self::animate`]
    pub fn queued_process(&self) -> AnimationProcess {
        self.queued
    }

    /// True if reversible
    pub fn is_reversible(&self) -> bool {
        self.reversible
    }

    /// Total duration including the delay
    pub fn duration_ms(&self) -> u32 {
        self.delay_ms.saturating_add(self.length_ms)
    }

    /// True if the animation's condition holds (or it has none)
    pub fn condition_met(&self, ctx: &ConditionContext<'_>) -> bool {
        self.condition.as_ref().map_or(true, |c| c.evaluate(ctx))
    }

    /// Request the animation run in `process` from the next frame
    pub fn queue(&mut self, process: AnimationProcess) {
        self.queued = process;
    }

    /// Return to the idle state with no transform
    pub fn reset(&mut self) {
        self.process = AnimationProcess::None;
        self.queued = AnimationProcess::None;
        self.state = AnimationState::None;
        self.amount = 0.0;
        self.transform = TransformMatrix::identity();
    }

    /// Jump straight to the finished state
    pub fn apply(&mut self, center: Point) {
        self.process = AnimationProcess::Normal;
        self.queued = AnimationProcess::None;
        self.state = AnimationState::Applied;
        self.amount = 1.0;
        self.calculate(center);
    }

    /// Set the starting condition without animating
    pub fn set_initial_condition(&mut self, ctx: &ConditionContext<'_>, center: Point) {
        self.last_condition = self.condition_met(ctx);
        if self.last_condition {
            self.apply(center);
        } else {
            self.reset();
        }
    }

    /// Re-evaluate a conditional animation's condition and queue on change
    pub fn update_condition(&mut self, ctx: &ConditionContext<'_>) {
        let condition = self.condition_met(ctx);
        if condition && !self.last_condition {
            self.queue(AnimationProcess::Normal);
        } else if !condition && self.last_condition {
            if self.reversible {
                self.queue(AnimationProcess::Reverse);
            } else {
                self.reset();
            }
        }
        self.last_condition = condition;
    }

    /// Advance to `now_ms`.
    ///
    /// `start_anim` is false until the owner has been rendered once; a queued
    /// forward animation stays queued until then so it starts from a drawn
    /// state.
    pub fn animate(&mut self, now_ms: u32, start_anim: bool) {
        match self.queued {
            AnimationProcess::Normal => {
                self.start_ms = if self.process == AnimationProcess::Reverse {
                    // turn around from the current amount
                    now_ms.saturating_sub((self.length_ms as f32 * self.amount) as u32)
                } else {
                    now_ms
                };
                self.process = AnimationProcess::Normal;
            }
            AnimationProcess::Reverse => {
                if self.process == AnimationProcess::Normal {
                    self.start_ms =
                        now_ms.saturating_sub((self.length_ms as f32 * (1.0 - self.amount)) as u32);
                } else if self.process == AnimationProcess::None {
                    self.start_ms = now_ms;
                }
                self.process = AnimationProcess::Reverse;
            }
            AnimationProcess::None => {}
        }
        if start_anim || self.queued == AnimationProcess::Reverse {
            self.queued = AnimationProcess::None;
        }

        let elapsed = now_ms.saturating_sub(self.start_ms);
        match self.process {
            AnimationProcess::Normal => {
                if elapsed < self.delay_ms {
                    self.amount = 0.0;
                    self.state = AnimationState::Delayed;
                } else if elapsed < self.delay_ms.saturating_add(self.length_ms) {
                    self.amount = (elapsed - self.delay_ms) as f32 / self.length_ms as f32;
                    self.state = AnimationState::InProcess;
                } else {
                    self.amount = 1.0;
                    self.state = AnimationState::Applied;
                }
            }
            AnimationProcess::Reverse => {
                if elapsed < self.length_ms {
                    self.amount = 1.0 - elapsed as f32 / self.length_ms as f32;
                    self.state = AnimationState::InProcess;
                } else {
                    self.amount = 0.0;
                    self.state = AnimationState::Applied;
                }
            }
            AnimationProcess::None => {}
        }
    }

    /// Recompute the transform about `center` and retire a finished process.
    ///
    /// Returns the transform to compose onto the control, identity if idle.
    pub fn render_transform(&mut self, center: Point) -> TransformMatrix {
        if self.process != AnimationProcess::None {
            self.calculate(center);
        }
        if self.state == AnimationState::Applied {
            self.process = AnimationProcess::None;
            self.queued = AnimationProcess::None;
        }
        if self.state == AnimationState::None {
            TransformMatrix::identity()
        } else {
            self.transform
        }
    }

    fn calculate(&mut self, center: Point) {
        let time = self.delay_ms.saturating_add((self.amount * self.length_ms as f32) as u32);
        self.transform = self
            .effects
            .iter()
            .fold(TransformMatrix::identity(), |acc, effect| acc * effect.transform_at(time, center));
    }

    /// Parse one `<animation>` element.
    ///
    /// `VisibleChange` yields a Visible animation plus the matching Hidden one.
    pub fn parse(element: &XmlElement) -> Result<Vec<Self>, SkinError> {
        let type_name = element.attr("type").unwrap_or(element.text.as_str());
        let invalid = || SkinError::InvalidValue {
            element: "animation".to_string(),
            value: type_name.to_string(),
        };

        let effect_elements: Vec<&XmlElement> = element.children_named("effect").collect();
        let effects = if effect_elements.is_empty() {
            vec![parse_effect(element)?]
        } else {
            effect_elements
                .into_iter()
                .map(parse_effect)
                .collect::<Result<Vec<_>, _>>()?
        };

        let condition = match element.attr("condition") {
            Some(text) => Some(Condition::parse(text).map_err(|err| SkinError::InvalidValue {
                element: "animation condition".to_string(),
                value: format!("{text}: {err}"),
            })?),
            None => None,
        };
        let reversible = element.attr("reversible").map_or(true, |v| !v.eq_ignore_ascii_case("false"));

        let build = |kind: AnimationType, effects: Vec<EffectSpec>| {
            let mut anim = Self::new(kind, effects).with_reversible(reversible);
            anim.condition = condition.clone();
            anim
        };

        if type_name.trim().eq_ignore_ascii_case("visiblechange") {
            let reversed = effects.iter().map(EffectSpec::reversed).collect();
            return Ok(vec![build(AnimationType::Visible, effects), build(AnimationType::Hidden, reversed)]);
        }
        let kind = AnimationType::from_name(type_name).ok_or_else(invalid)?;
        if kind == AnimationType::Conditional && condition.is_none() {
            return Err(SkinError::InvalidValue {
                element: "animation".to_string(),
                value: "conditional animation without condition".to_string(),
            });
        }
        Ok(vec![build(kind, effects)])
    }
}

impl EffectSpec {
    fn reversed(&self) -> Self {
        let effect = match self.effect {
            AnimationEffect::Fade { start, end } => AnimationEffect::Fade { start: end, end: start },
            AnimationEffect::Slide { start, end } => AnimationEffect::Slide { start: end, end: start },
            AnimationEffect::Zoom { start, end, center } => AnimationEffect::Zoom {
                start: end,
                end: start,
                center,
            },
        };
        Self { effect, ..self.clone() }
    }
}

fn parse_pair(text: Option<&str>, default: (f32, f32)) -> Result<(f32, f32), SkinError> {
    let Some(text) = text else {
        return Ok(default);
    };
    let invalid = || SkinError::InvalidValue {
        element: "animation".to_string(),
        value: text.to_string(),
    };
    let values = text
        .split(',')
        .map(|part| part.trim().parse::<f32>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [v] => Ok((*v, *v)),
        [x, y] => Ok((*x, *y)),
        _ => Err(invalid()),
    }
}

fn parse_effect(element: &XmlElement) -> Result<EffectSpec, SkinError> {
    let effect_name = if element.name == "effect" {
        element.attr("type")
    } else {
        element.attr("effect")
    }
    .unwrap_or("fade")
    .to_lowercase();
    let start = element.attr("start");
    let end = element.attr("end");

    let effect = match effect_name.as_str() {
        "fade" => {
            let (start, _) = parse_pair(start, (0.0, 0.0))?;
            let (end, _) = parse_pair(end, (100.0, 100.0))?;
            AnimationEffect::Fade {
                start: start / 100.0,
                end: end / 100.0,
            }
        }
        "slide" => {
            let (sx, sy) = parse_pair(start, (0.0, 0.0))?;
            let (ex, ey) = parse_pair(end, (0.0, 0.0))?;
            AnimationEffect::Slide {
                start: Point::new(sx, sy),
                end: Point::new(ex, ey),
            }
        }
        "zoom" => {
            let (sx, sy) = parse_pair(start, (100.0, 100.0))?;
            let (ex, ey) = parse_pair(end, (100.0, 100.0))?;
            let center = match element.attr("center") {
                Some(text) if !text.eq_ignore_ascii_case("auto") => {
                    let (cx, cy) = parse_pair(Some(text), (0.0, 0.0))?;
                    Some(Point::new(cx, cy))
                }
                _ => None,
            };
            AnimationEffect::Zoom {
                start: (sx / 100.0, sy / 100.0),
                end: (ex / 100.0, ey / 100.0),
                center,
            }
        }
        other => {
            return Err(SkinError::InvalidValue {
                element: "animation effect".to_string(),
                value: other.to_string(),
            })
        }
    };

    let tween = match element.attr("tween").map(str::to_lowercase).as_deref() {
        None | Some("linear") => Tween::Linear,
        Some("quadratic") => Tween::Quadratic,
        Some("cubic") => Tween::Cubic,
        Some("sine") => Tween::Sine,
        Some("back") => Tween::Back,
        Some(other) => {
            log::warn!("Unsupported tween '{}', using linear", other);
            Tween::Linear
        }
    };
    let easing = match element.attr("easing").map(str::to_lowercase).as_deref() {
        Some("in") => Easing::In,
        Some("inout") => Easing::InOut,
        _ => Easing::Out,
    };

    Ok(EffectSpec {
        effect,
        delay_ms: element.attr_value("delay")?.unwrap_or(0),
        length_ms: element.attr_value("time")?.unwrap_or(0),
        tween,
        easing,
    })
}
