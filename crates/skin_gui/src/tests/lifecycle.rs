use std::sync::Arc;
use std::thread;
use std::time::Instant;

use super::context_with;
use crate::controls::{AnimationType, Control};
use crate::foundation::math::{Point, Resolution};
use crate::messages::{Direction, Message, MessageId};
use crate::render::{DrawCommand, DrawList};
use crate::skin::XmlElement;
use crate::textures::TextureKey;
use crate::window::{LoadType, Window};

fn load(window: &mut Window, xml: &str) {
    let root = XmlElement::parse(xml).unwrap();
    assert!(window.load_from_xml(&root, Resolution::HD_720));
}

fn allocated(window: &Window, id: i32) -> bool {
    window.control(id).unwrap().base().is_allocated()
}

const TWO_IMAGES: &str = r#"
    <window>
        <controls>
            <control type="image" id="1"><texture>a.png</texture><width>10</width><height>10</height></control>
            <control type="image" id="2">
                <texture>b.png</texture><width>10</width><height>10</height>
                <visible>!hide_b</visible>
            </control>
        </controls>
    </window>"#;

#[test]
fn test_texture_references_balance_over_many_cycles() {
    let context = context_with(&[("a.png", 1)]);
    let textures = &context.textures;
    let key = TextureKey::from_name("a.png");

    for _ in 0..5 {
        assert_eq!(textures.load(&key), 1);
    }
    assert_eq!(textures.ref_count(&key), Some(5));
    for _ in 0..5 {
        assert!(textures.release(&key));
    }
    assert_eq!(textures.ref_count(&key), Some(0));
    assert!(!textures.release(&key), "count never goes below zero");
    assert_eq!(textures.ref_count(&key), Some(0));

    assert_eq!(textures.cleanup(Instant::now()), 1);
    assert!(!textures.is_cached(&key));
}

#[test]
fn test_dynamic_allocation_follows_visibility() {
    let context = context_with(&[("a.png", 1), ("b.png", 1)]);
    let mut window = Window::new(1, "two.xml", context.clone());
    window.set_load_type(LoadType::KeepInMemory);
    load(&mut window, TWO_IMAGES);
    window
        .tree_mut()
        .control_mut(1)
        .unwrap()
        .base_mut()
        .set_dynamic_resource_alloc(false);

    assert!(window.alloc_resources(false));
    assert!(allocated(&window, 1));
    assert!(allocated(&window, 2));
    let b = TextureKey::from_name("b.png");
    let before = context.textures.ref_count(&b);
    assert_eq!(before, Some(1));

    context.info.set_bool("hide_b", true);
    window.process(0);
    assert!(allocated(&window, 1), "non-dynamic control keeps its resources");
    assert!(!allocated(&window, 2));
    assert_eq!(context.textures.ref_count(&b), Some(0));

    context.info.set_bool("hide_b", false);
    window.process(16);
    assert!(allocated(&window, 2));
    assert_eq!(context.textures.ref_count(&b), before);
}

#[test]
fn test_constant_conditions_decide_allocation() {
    let context = context_with(&[("a.png", 1), ("b.png", 1)]);
    let mut window = Window::new(1, "constant.xml", context);
    load(
        &mut window,
        r#"<window><controls>
            <control type="image" id="1"><texture>a.png</texture><visible>false</visible></control>
            <control type="image" id="2"><texture>b.png</texture><visible>true</visible></control>
        </controls></window>"#,
    );
    window.alloc_resources(false);
    window.process(0);
    assert!(!allocated(&window, 1));
    assert!(allocated(&window, 2));
}

#[test]
fn test_hidden_controls_draw_nothing() {
    let context = context_with(&[("a.png", 1), ("b.png", 1)]);
    let mut window = Window::new(1, "two.xml", context.clone());
    load(&mut window, TWO_IMAGES);
    context.info.set_bool("hide_b", true);

    let mut list = DrawList::new();
    window.render(&mut list).unwrap();
    assert!(list.commands().is_empty(), "unallocated window draws nothing");

    window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
    window.process(0);
    window.render(&mut list).unwrap();
    assert!(!allocated(&window, 2));
    assert_eq!(list.texture_draws(), 1);
    assert!(matches!(list.commands().first(), Some(DrawCommand::BeginWindow(1))));
}

#[test]
fn test_load_twice_keeps_the_first_tree() {
    let context = context_with(&[]);
    let mut window = Window::new(1, "two.xml", context);
    load(&mut window, TWO_IMAGES);
    let keys = window.tree().keys();
    let ids: Vec<i32> = keys.iter().map(|k| window.tree().get(*k).unwrap().id()).collect();

    load(&mut window, "<window><controls><control type=\"label\" id=\"9\"/></controls></window>");
    assert_eq!(window.tree().keys(), keys);
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_navigation_cycle_returns_false() {
    let context = context_with(&[]);
    let mut window = Window::new(1, "cycle.xml", context);
    load(
        &mut window,
        r#"<window><defaultcontrol>10</defaultcontrol><controls>
            <control type="button" id="10"><onright>20</onright></control>
            <control type="button" id="20"><onright>10</onright></control>
        </controls></window>"#,
    );
    window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
    window.on_message(&mut Message::new(MessageId::Disabled, 0, 20));
    assert_eq!(window.focused_control_id(), Some(10));

    assert!(!window.on_move(10, Direction::Right));
    assert_eq!(window.focused_control_id(), Some(10));
}

#[test]
fn test_origin_resolution_is_stable_within_a_frame() {
    let context = context_with(&[]);
    let mut window = Window::new(1, "origins.xml", context.clone());
    load(
        &mut window,
        r#"<window><coordinates>
            <posx>5</posx><posy>5</posy>
            <origin x="100" y="100" condition="off">a</origin>
            <origin x="200" y="50" condition="on">b</origin>
            <origin x="300" y="10">c</origin>
        </coordinates></window>"#,
    );
    context.info.set_bool("on", true);
    let first = window.resolve_origin();
    for _ in 0..10 {
        assert_eq!(window.resolve_origin(), first);
    }
    assert_eq!(first, Point::new(200.0, 50.0));
}

#[test]
fn test_force_unload_empties_window_and_releases_textures() {
    let context = context_with(&[("a.png", 1), ("b.png", 1)]);
    let mut window = Window::new(1, "two.xml", context.clone());
    window.set_load_type(LoadType::KeepInMemory);
    load(&mut window, TWO_IMAGES);
    window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
    assert_eq!(context.textures.ref_count(&TextureKey::from_name("a.png")), Some(1));

    window.free_resources(true);
    assert!(!window.is_loaded());
    assert!(!window.is_allocated());
    assert!(window.tree().is_empty());
    for name in ["a.png", "b.png"] {
        assert_eq!(context.textures.ref_count(&TextureKey::from_name(name)), Some(0));
    }
    assert_eq!(context.textures.cleanup_all(), 2);
}

#[test]
fn test_close_animation_defers_free() {
    let context = context_with(&[("a.png", 1)]);
    let mut window = Window::new(1, "anim.xml", context.clone());
    load(
        &mut window,
        r#"<window>
            <animation effect="fade" start="100" end="0" time="200">WindowClose</animation>
            <controls>
                <control type="image" id="1"><texture>a.png</texture></control>
            </controls>
        </window>"#,
    );
    window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
    window.process(0);
    window.render(&mut DrawList::new()).unwrap();

    window.on_message(&mut Message::new(MessageId::WindowDeinit, 0, 0));
    assert!(window.is_closing());
    assert!(window.tree().is_animating(AnimationType::WindowClose));
    assert!(window.is_allocated());

    window.process(100);
    window.render(&mut DrawList::new()).unwrap();
    window.process(400);
    assert!(!window.is_closing());
    assert!(!window.is_allocated());
    assert_eq!(context.textures.ref_count(&TextureKey::from_name("a.png")), Some(0));
}

#[test]
fn test_hidden_group_children_release_textures() {
    let context = context_with(&[("a.png", 1)]);
    let mut window = Window::new(1, "group.xml", context.clone());
    window.set_load_type(LoadType::KeepInMemory);
    load(
        &mut window,
        r#"<window><controls>
            <control type="group" id="100">
                <visible>panel</visible>
                <control type="image" id="1"><texture>a.png</texture></control>
            </control>
        </controls></window>"#,
    );
    context.info.set_bool("panel", true);
    window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
    window.process(0);
    assert!(allocated(&window, 1));

    context.info.set_bool("panel", false);
    window.process(16);
    assert!(!allocated(&window, 1));
    assert_eq!(context.textures.ref_count(&TextureKey::from_name("a.png")), Some(0));
}

#[test]
fn test_control_shown_by_animation_is_allocated_before_drawing() {
    let context = context_with(&[("nofocus.png", 1)]);
    let mut window = Window::new(1, "fadein.xml", context.clone());
    window.set_load_type(LoadType::KeepInMemory);
    load(
        &mut window,
        r#"<window><controls>
            <control type="button" id="3">
                <texturenofocus>nofocus.png</texturenofocus>
                <visible>show_button</visible>
                <animation effect="fade" start="0" end="100" time="200">Visible</animation>
            </control>
        </controls></window>"#,
    );
    window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
    window.process(0);
    window.render(&mut DrawList::new()).unwrap();
    assert!(!allocated(&window, 3));

    context.info.set_bool("show_button", true);
    window.process(16);
    assert!(window.control(3).unwrap().base().is_shown());
    assert!(allocated(&window, 3), "shown in the same frame it is drawn");
    assert_eq!(context.textures.ref_count(&TextureKey::from_name("nofocus.png")), Some(1));

    let mut list = DrawList::new();
    window.render(&mut list).unwrap();
    assert_eq!(list.texture_draws(), 1);
}

const SHARED_IMAGES: &str = r#"
    <window>
        <controls>
            <control type="image" id="1"><texture>shared.png</texture><width>10</width><height>10</height></control>
            <control type="image" id="2"><texture>own.png</texture><width>10</width><height>10</height></control>
        </controls>
    </window>"#;

#[test]
fn test_allocation_on_a_loader_thread_is_serialized_with_rendering() {
    let context = context_with(&[("shared.png", 1), ("own.png", 1), ("a.png", 1), ("b.png", 1)]);

    let worker_context = Arc::clone(&context);
    let worker = thread::spawn(move || {
        let mut window = Window::new(2, "shared.xml", worker_context);
        window.set_load_type(LoadType::KeepInMemory);
        load(&mut window, SHARED_IMAGES);
        for _ in 0..200 {
            assert!(window.alloc_resources(false));
            assert!(allocated(&window, 1) && allocated(&window, 2));
            window.free_resources(false);
            assert!(!allocated(&window, 1) && !allocated(&window, 2));
        }
    });

    let mut window = Window::new(1, "two.xml", Arc::clone(&context));
    window.set_load_type(LoadType::KeepInMemory);
    load(&mut window, TWO_IMAGES);
    for frame in 0..200u32 {
        window.on_message(&mut Message::new(MessageId::WindowInit, 0, 0));
        window.process(frame * 16);
        let mut list = DrawList::new();
        window.render(&mut list).unwrap();
        assert_eq!(list.texture_draws(), 2);
        window.free_resources(false);
    }
    worker.join().unwrap();

    for name in ["shared.png", "own.png", "a.png", "b.png"] {
        assert_eq!(context.textures.ref_count(&TextureKey::from_name(name)), Some(0), "{name}");
    }
}
