//! Parent containers and fallback resolvers.

mod common;

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::FutureExt;
use latebind_di::{Container, ContainerOptions, Instance, ModuleId, OverridePolicy};

#[tokio::test]
async fn child_resolves_from_parent() {
    let root = Container::new();
    root.register("logger", "root logger").unwrap();

    let child = root.child();
    let logger = child.require::<&str>("logger").await.unwrap();
    assert_eq!(*logger, "root logger");
    assert!(!child.has_pending_require_requests());
}

#[tokio::test]
async fn lookup_walks_the_whole_chain() {
    let root = Container::new();
    root.register("db", 1_u8).unwrap();
    let middle = root.child();
    middle.register("cache", 2_u8).unwrap();
    let leaf = middle.child();

    assert_eq!(*leaf.require::<u8>("db").await.unwrap(), 1);
    assert_eq!(*leaf.require::<u8>("cache").await.unwrap(), 2);
}

#[tokio::test]
async fn local_binding_shadows_parent() {
    let root = Container::new();
    root.register("mode", "production").unwrap();
    let child = root.child();
    child.register("mode", "test").unwrap();

    assert_eq!(*child.require::<&str>("mode").await.unwrap(), "test");
    assert_eq!(*root.require::<&str>("mode").await.unwrap(), "production");
}

#[tokio::test]
async fn parent_lookup_is_a_snapshot() {
    common::init_tracing();
    let parent = Container::new();
    let child = parent.child();

    let mut pending = child.require_single("x");
    assert!(pending.is_parked());

    parent.register("x", 1_i32).unwrap();
    assert!((&mut pending).now_or_never().is_none());
    assert!(child.has_pending_require_requests());

    let timed_out = tokio::time::timeout(Duration::from_millis(20), &mut pending).await;
    assert!(timed_out.is_err());

    // Only a registration on the child itself settles it
    child.register("x", 2_i32).unwrap();
    let instance = pending.await.unwrap();
    assert_eq!(instance.downcast_ref::<i32>(), Some(&2));
}

#[tokio::test]
async fn child_registration_does_not_touch_parent() {
    let parent = Container::new();
    let parent_waiter = parent.require_single("x");
    let child = parent.child();

    child.register("x", 1_i32).unwrap();
    assert!(parent.get("x").is_none());
    assert!(parent.has_pending_require_requests());
    drop(parent_waiter);
}

#[test]
fn child_inherits_options() {
    let root = Container::builder()
        .options(ContainerOptions::no_override())
        .build();
    let child = root.child();
    assert_eq!(child.options().override_policy, OverridePolicy::Reject);
    assert!(child.parent().is_some());
    assert!(root.parent().is_none());
}

#[tokio::test]
async fn fallback_resolves_missing_modules() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let container = Container::builder()
        .fallback(move |id| {
            counted.fetch_add(1, Ordering::SeqCst);
            match id {
                ModuleId::Name(name) if name.starts_with("env:") => {
                    Some(Instance::new(format!("value of {}", &name[4..])))
                }
                _ => None,
            }
        })
        .build();

    let home = container.require::<String>("env:HOME").await.unwrap();
    assert_eq!(home.as_str(), "value of HOME");
    // Fallback results are not registered
    assert!(container.get("env:HOME").is_none());

    let pending = container.require_single("other");
    assert!(pending.is_parked());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fallback_comes_after_the_parent_chain() {
    let root = Container::new();
    root.register("name", "from parent").unwrap();

    let child = Container::builder()
        .parent(&root)
        .fallback(|_| Some(Instance::new("from fallback")))
        .build();

    assert_eq!(*child.require::<&str>("name").await.unwrap(), "from parent");
    assert_eq!(*child.require::<&str>("unknown").await.unwrap(), "from fallback");
}

#[test]
fn get_never_uses_fallback() {
    let container = Container::builder()
        .fallback(|_| Some(Instance::new(1_u8)))
        .build();
    assert!(container.get("anything").is_none());
}
