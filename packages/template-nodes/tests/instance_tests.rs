//! Template node mapping against layer maps produced by a live preview.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use trellis_livetree::LivePreview;
use trellis_models::{
    ActionElement, ActionLocation, InsertPosition, SourcePosition, SourceRange, TemplateNode,
};
use trellis_template_nodes::{
    InMemoryInstanceResolver, InMemoryTemplateSource, InstanceResolver, TemplateNodeMap,
};

const SURFACE: &str = "frame-1";

fn node(oid: &str, component: &str, line: u32) -> TemplateNode {
    let range = SourceRange {
        start: SourcePosition { line, column: 0 },
        end: SourcePosition { line, column: 10 },
    };
    let path = format!("components/{}.tsx", component.to_lowercase());
    TemplateNode::new(oid, path, range).with_component(component)
}

fn card(dom_id: &str) -> ActionElement {
    ActionElement::new("div", dom_id)
        .with_oid("card-root")
        .with_child(ActionElement::new("h2", format!("{dom_id}-title")).with_oid("card-title"))
}

fn page() -> ActionElement {
    ActionElement::new("main", "main")
        .with_oid("page-main")
        .with_child(card("card-a"))
        .with_child(card("card-b"))
}

fn source() -> Arc<InMemoryTemplateSource> {
    Arc::new(
        [
            node("page-main", "Page", 3),
            node("card-root", "Card", 1),
            node("card-title", "Card", 2),
        ]
        .into_iter()
        .collect(),
    )
}

fn resolver() -> InMemoryInstanceResolver {
    let mut resolver = InMemoryInstanceResolver::new();
    resolver.insert("page-main", "card-root", 0, node("page-card-0", "Page", 4));
    resolver.insert("page-main", "card-root", 1, node("page-card-1", "Page", 5));
    resolver
}

/// Counts calls so tests can observe caching.
struct CountingResolver {
    inner: InMemoryInstanceResolver,
    calls: AtomicUsize,
}

#[async_trait]
impl InstanceResolver for CountingResolver {
    async fn resolve_instance(
        &self,
        parent: &TemplateNode,
        child: &TemplateNode,
        index: usize,
    ) -> Option<TemplateNode> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve_instance(parent, child, index).await
    }
}

async fn mapped() -> (LivePreview, TemplateNodeMap) {
    let mut preview = LivePreview::new(SURFACE);
    let layers = preview.load(&page()).unwrap();
    let map = TemplateNodeMap::new(source(), Arc::new(resolver()));
    map.set_layer_map(SURFACE, layers).await;
    (preview, map)
}

#[tokio::test]
async fn test_root_mapping_for_every_marked_element() {
    let (_, map) = mapped().await;

    assert_eq!(map.get_root(SURFACE, "main").await.unwrap().oid, "page-main");
    assert_eq!(map.get_root(SURFACE, "card-a").await.unwrap().oid, "card-root");
    assert_eq!(map.get_root(SURFACE, "card-b-title").await.unwrap().oid, "card-title");
}

#[tokio::test]
async fn test_instances_follow_occurrence_order() {
    let (_, map) = mapped().await;

    let first = map.get_instance(SURFACE, "card-a").await.unwrap();
    let second = map.get_instance(SURFACE, "card-b").await.unwrap();
    assert_eq!(first.oid, "page-card-0");
    assert_eq!(second.oid, "page-card-1");
}

#[tokio::test]
async fn test_get_any_prefers_instance_over_root() {
    let (_, map) = mapped().await;

    assert_eq!(map.get_any(SURFACE, "card-a").await.unwrap().oid, "page-card-0");
    // Nested elements with no call site of their own fall back to the root.
    assert_eq!(map.get_instance(SURFACE, "card-a-title").await, None);
    assert_eq!(map.get_any(SURFACE, "card-a-title").await.unwrap().oid, "card-title");
}

#[tokio::test]
async fn test_resolution_is_cached() {
    let mut preview = LivePreview::new(SURFACE);
    let layers = preview.load(&page()).unwrap();
    let counting = Arc::new(CountingResolver {
        inner: resolver(),
        calls: AtomicUsize::new(0),
    });
    let map = TemplateNodeMap::new(source(), counting.clone());
    map.set_layer_map(SURFACE, layers).await;

    let after_mapping = counting.calls.load(Ordering::SeqCst);
    assert!(after_mapping > 0);

    let first = map.resolve_instance(SURFACE, "card-b").await.unwrap();
    let again = map.resolve_instance(SURFACE, "card-b").await.unwrap();
    assert_eq!(first, again);
    assert_eq!(counting.calls.load(Ordering::SeqCst), after_mapping);
}

#[tokio::test]
async fn test_subtree_update_invalidates_removed_addresses() {
    let (mut preview, map) = mapped().await;

    let removed = preview
        .remove_element(&ActionLocation {
            target_address: "main".into(),
            target_source_id: None,
            position: InsertPosition::Index { index: 0 },
        })
        .unwrap();
    map.update_layer_map(SURFACE, &removed.parent_id, removed.layers).await;

    assert_eq!(map.get_any(SURFACE, "card-a").await, None);
    assert_eq!(map.get_any(SURFACE, "card-a-title").await, None);
    // The remaining card is now the first occurrence.
    assert_eq!(map.get_instance(SURFACE, "card-b").await.unwrap().oid, "page-card-0");
    // The parent keeps its link to the rest of the tree.
    assert!(map.layer(SURFACE, "main").await.unwrap().parent.is_some());
}

#[tokio::test]
async fn test_remove_surface_clears_everything() {
    let (_, map) = mapped().await;
    map.remove_surface(SURFACE).await;

    assert_eq!(map.get_any(SURFACE, "card-a").await, None);
    assert!(map.resolve_instance(SURFACE, "card-a").await.is_err());
}

#[tokio::test]
async fn test_remove_address_drops_subtree() {
    let (_, map) = mapped().await;
    map.remove_address(SURFACE, "card-a").await;

    assert_eq!(map.get_root(SURFACE, "card-a").await, None);
    assert_eq!(map.get_root(SURFACE, "card-a-title").await, None);
    assert!(map.get_root(SURFACE, "card-b").await.is_some());
}
