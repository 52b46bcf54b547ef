//! Reconciliation scenarios and properties.
//!
//! Every test here checks two things: the exact patch stream where it is
//! predictable, and that applying the stream to a mirror of the old tree
//! yields the new tree.

use alloc::{vec, vec::Vec};

use proptest::prelude::*;

use crate::{
    arena::{Arena, DEFAULT_CAPACITY, NodeId},
    builder::TreeBuilder,
    diff::{Differ, diff},
    event::Event,
    mirror::{MirrorNode, MirrorTree},
    patch::{Patch, PatchKind, PatchList},
    runtime::Runtime,
    state::Filter,
    vnode::{PropFlags, Props, Tag},
};

// ============================================================================
// Test Infrastructure
// ============================================================================

/// Plain description of a tree, built into an arena on demand.
#[derive(Debug, Clone)]
struct Node {
    tag: Tag,
    key: Option<u8>,
    text: Option<u8>,
    checked: bool,
    children: Vec<Node>,
}

impl Node {
    fn new(tag: Tag) -> Self {
        Self {
            tag,
            key: None,
            text: None,
            checked: false,
            children: Vec::new(),
        }
    }

    fn key(mut self, key: u8) -> Self {
        self.key = Some(key);
        self
    }

    fn text(mut self, text: u8) -> Self {
        self.text = Some(text);
        self
    }

    fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    fn write(&self, tree: &mut TreeBuilder<'_>) {
        tree.open(self.tag)
            .props(Props::new().flag(PropFlags::CHECKED, self.checked));
        if let Some(key) = self.key {
            tree.key_fmt(format_args!("k{key}"));
        }
        if let Some(text) = self.text {
            tree.text_fmt(format_args!("t{text}"));
        }
        for child in &self.children {
            child.write(tree);
        }
        tree.close();
    }

    fn build(&self, arena: &mut Arena) -> NodeId {
        let mut tree = arena.builder();
        self.write(&mut tree);
        tree.finish().expect("test tree builds")
    }
}

fn keyed(keys: &[u8]) -> Node {
    keys.iter().fold(Node::new(Tag::List), |list, key| {
        list.child(Node::new(Tag::ListItem).key(*key).text(*key))
    })
}

fn unkeyed(texts: &[u8]) -> Node {
    texts.iter().fold(Node::new(Tag::Container), |parent, text| {
        parent.child(Node::new(Tag::Text).text(*text))
    })
}

/// Diffs `old` against `new`, checks the patches converge and returns them.
fn reconcile(old: &Node, new: &Node) -> PatchList {
    let mut old_arena = Arena::with_lane(DEFAULT_CAPACITY, 0, 2);
    let mut new_arena = Arena::with_lane(DEFAULT_CAPACITY, 1, 2);
    let old_root = old.build(&mut old_arena);
    let new_root = new.build(&mut new_arena);

    let patches = diff(&old_arena, old_root, &new_arena, new_root);
    let mut mirror = MirrorTree::from_arena(&old_arena, old_root).expect("old tree mirrors");
    mirror
        .apply(&new_arena, &patches)
        .expect("patches fit the old tree");
    let expected = MirrorNode::from_arena(&new_arena, new_root).expect("new tree mirrors");
    assert_eq!(mirror.root(), Some(&expected));
    patches
}

fn structural(patches: &PatchList) -> Vec<Patch<'_>> {
    patches.iter().map(|entry| entry.patch).collect()
}

// ============================================================================
// Scenarios
// ============================================================================

/// Builds a keyed list with one `ListItem` per entry of `keys`.
fn wide_list(arena: &mut Arena, keys: impl Iterator<Item = usize>) -> NodeId {
    let mut tree = arena.builder();
    tree.open(Tag::List);
    for key in keys {
        tree.open(Tag::ListItem)
            .key_fmt(format_args!("row-{key}"))
            .close();
    }
    tree.close();
    tree.finish().expect("wide list builds")
}

#[test]
fn identical_trees_produce_no_patches() {
    let tree = keyed(&[1, 2, 3]).checked();
    assert!(reconcile(&tree, &tree).is_empty());
}

#[test]
fn keyed_reorder_moves_a_single_child() {
    let patches = reconcile(&keyed(&[0, 1, 2]), &keyed(&[2, 0, 1]));
    assert_eq!(structural(&patches), [Patch::MoveChild { from: 2, to: 0 }]);
    assert!(patches.get(0).is_some_and(|entry| entry.path.is_empty()));
}

#[test]
fn tag_change_replaces_without_text_update() {
    let old = Node::new(Tag::Text).text(7);
    let new = Node::new(Tag::Button).text(7);
    let patches = reconcile(&old, &new);
    assert_eq!(patches.len(), 1);
    assert_eq!(patches.count(PatchKind::Replace), 1);
    assert_eq!(patches.count(PatchKind::UpdateText), 0);
}

#[test]
fn positional_children_grow_and_shrink_at_the_end() {
    let patches = reconcile(&unkeyed(&[1, 2]), &unkeyed(&[1, 2, 3]));
    assert!(matches!(
        structural(&patches)[..],
        [Patch::InsertChild { index: 2, .. }]
    ));

    let patches = reconcile(&unkeyed(&[1, 2, 3]), &unkeyed(&[1]));
    assert_eq!(
        structural(&patches),
        [
            Patch::RemoveChild { index: 2 },
            Patch::RemoveChild { index: 1 }
        ]
    );

    let patches = reconcile(&unkeyed(&[1, 2]), &unkeyed(&[1, 5]));
    let entry = patches.get(0).expect("one text update");
    assert_eq!(entry.path, [1]);
    assert_eq!(entry.patch, Patch::UpdateText("t5"));
}

#[test]
fn insert_and_reorder_in_one_pass() {
    let patches = reconcile(&keyed(&[0, 1, 2, 3]), &keyed(&[3, 4, 0, 2]));
    let patches = structural(&patches);
    assert_eq!(patches.len(), 3);
    assert_eq!(patches[0], Patch::RemoveChild { index: 1 });
    assert_eq!(patches[1], Patch::MoveChild { from: 2, to: 0 });
    assert!(matches!(patches[2], Patch::InsertChild { index: 1, .. }));
}

#[test]
fn mixed_siblings_match_keys_first_then_unkeyed_in_order() {
    let old = Node::new(Tag::Container)
        .child(Node::new(Tag::Button).key(1).text(1))
        .child(Node::new(Tag::Text).text(10))
        .child(Node::new(Tag::Button).key(2).text(2));
    let new = Node::new(Tag::Container)
        .child(Node::new(Tag::Button).key(2).text(2))
        .child(Node::new(Tag::Text).text(11))
        .child(Node::new(Tag::Button).key(1).text(1));
    let patches = reconcile(&old, &new);
    assert_eq!(patches.count(PatchKind::Replace), 0);
    assert_eq!(patches.count(PatchKind::InsertChild), 0);
    assert_eq!(patches.count(PatchKind::RemoveChild), 0);
    assert_eq!(patches.count(PatchKind::MoveChild), 2);
    let update = patches
        .iter()
        .find(|entry| entry.patch.kind() == PatchKind::UpdateText)
        .expect("unkeyed child updated in place");
    assert_eq!(update.path, [1]);
}

#[test]
fn duplicate_keys_still_converge() {
    reconcile(&keyed(&[1, 1, 2]), &keyed(&[1, 2, 1]));
    reconcile(&keyed(&[1, 2]), &keyed(&[2, 2, 2]));
}

#[test]
fn props_and_text_update_in_place() {
    let old = Node::new(Tag::Button).text(1);
    let new = Node::new(Tag::Button).text(2).checked();
    let patches = reconcile(&old, &new);
    let kinds: Vec<_> = patches.iter().map(|entry| entry.patch.kind()).collect();
    assert_eq!(kinds, [PatchKind::UpdateProps, PatchKind::UpdateText]);
}

#[test]
fn disappearing_text_degrades_to_replace() {
    let patches = reconcile(&Node::new(Tag::Button).text(1), &Node::new(Tag::Button));
    assert_eq!(structural(&patches).len(), 1);
    assert_eq!(patches.count(PatchKind::Replace), 1);
}

#[test]
fn malformed_text_leaf_is_replaced() {
    let old = Node::new(Tag::Text).text(1);
    let new = Node::new(Tag::Text).text(1).child(Node::new(Tag::Icon));
    let patches = reconcile(&old, &new);
    assert_eq!(patches.count(PatchKind::Replace), 1);
    assert_eq!(patches.len(), 1);
}

#[test]
fn stale_old_tree_falls_back_to_root_replace() {
    let mut old_arena = Arena::with_lane(DEFAULT_CAPACITY, 0, 2);
    let mut new_arena = Arena::with_lane(DEFAULT_CAPACITY, 1, 2);
    let old = keyed(&[1, 2]).build(&mut old_arena);
    old_arena.reset();
    let new = keyed(&[2, 1]).build(&mut new_arena);

    let patches = diff(&old_arena, old, &new_arena, new);
    assert_eq!(patches.len(), 1);
    let entry = patches.get(0).expect("root replace");
    assert!(entry.path.is_empty());
    assert_eq!(entry.patch, Patch::Replace(new));
}

#[test]
fn nested_paths_follow_new_positions() {
    let old = Node::new(Tag::Container)
        .child(keyed(&[1]).key(1))
        .child(keyed(&[2]).key(2));
    let new = Node::new(Tag::Container)
        .child(keyed(&[2, 3]).key(2))
        .child(keyed(&[1]).key(1));
    let patches = reconcile(&old, &new);
    let insert = patches
        .iter()
        .find(|entry| entry.patch.kind() == PatchKind::InsertChild)
        .expect("insert into moved list");
    assert_eq!(insert.path, [0]);
}

#[test]
fn differ_reuse_matches_fresh_diff() {
    let mut differ = Differ::new();
    let mut out = PatchList::new();
    let pairs = [
        (keyed(&[0, 1, 2, 3]), keyed(&[3, 2, 1, 0])),
        (unkeyed(&[1, 2, 3]), unkeyed(&[3])),
        (keyed(&[5]), keyed(&[])),
    ];
    for (old, new) in &pairs {
        let mut old_arena = Arena::with_lane(DEFAULT_CAPACITY, 0, 2);
        let mut new_arena = Arena::with_lane(DEFAULT_CAPACITY, 1, 2);
        let old_root = old.build(&mut old_arena);
        let new_root = new.build(&mut new_arena);
        differ.diff(&old_arena, old_root, &new_arena, new_root, &mut out);
        assert_eq!(out, diff(&old_arena, old_root, &new_arena, new_root));
    }
}

#[test]
fn long_reversal_moves_every_row_but_one() {
    const ROWS: usize = 4000;
    let mut old_arena = Arena::with_lane(DEFAULT_CAPACITY * 4, 0, 2);
    let mut new_arena = Arena::with_lane(DEFAULT_CAPACITY * 4, 1, 2);
    let old_root = wide_list(&mut old_arena, 0..ROWS);
    let new_root = wide_list(&mut new_arena, (0..ROWS).rev());

    let patches = diff(&old_arena, old_root, &new_arena, new_root);
    assert_eq!(patches.len(), ROWS - 1);
    assert_eq!(patches.count(PatchKind::MoveChild), ROWS - 1);

    let mut mirror = MirrorTree::from_arena(&old_arena, old_root).expect("old tree mirrors");
    mirror
        .apply(&new_arena, &patches)
        .expect("patches fit the old tree");
    let expected = MirrorNode::from_arena(&new_arena, new_root).expect("new tree mirrors");
    assert_eq!(mirror.root(), Some(&expected));
}

// ============================================================================
// Properties
// ============================================================================

fn arb_tag() -> impl Strategy<Value = Tag> {
    prop::sample::select(vec![
        Tag::Container,
        Tag::List,
        Tag::ListItem,
        Tag::Button,
        Tag::Text,
    ])
}

fn arb_node() -> impl Strategy<Value = Node> {
    let leaf = (
        arb_tag(),
        prop::option::of(0_u8..6),
        prop::option::of(0_u8..4),
        any::<bool>(),
    )
        .prop_map(|(tag, key, text, checked)| Node {
            tag,
            key,
            text,
            checked,
            children: Vec::new(),
        });
    leaf.prop_recursive(4, 64, 6, |inner| {
        (
            arb_tag(),
            prop::option::of(0_u8..6),
            prop::option::of(0_u8..4),
            any::<bool>(),
            prop::collection::vec(inner, 0..6),
        )
            .prop_map(|(tag, key, text, checked, children)| Node {
                tag,
                key,
                text,
                checked,
                children,
            })
    })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Increment),
        Just(Event::Decrement),
        Just(Event::Reset),
        (0_u8..4).prop_map(|n| Event::TodoAdd(alloc::format!("task {n}"))),
        (0_u32..6).prop_map(Event::TodoToggle),
        (0_u32..6).prop_map(Event::TodoRemove),
        Just(Event::TodoToggleAll),
        Just(Event::TodoClearCompleted),
        prop::sample::select(Filter::ALL.to_vec()).prop_map(Event::SetFilter),
        (0_u32..3).prop_map(|screen| Event::Navigate { screen }),
        Just(Event::Back),
    ]
}

/// Longest strictly increasing subsequence, quadratic reference.
fn lis_len(values: &[usize]) -> usize {
    let mut best = vec![1; values.len()];
    for i in 0..values.len() {
        for j in 0..i {
            if values[j] < values[i] {
                best[i] = best[i].max(best[j] + 1);
            }
        }
    }
    best.into_iter().max().unwrap_or(0)
}

proptest! {
    #[test]
    fn patches_converge_on_the_new_tree(old in arb_node(), new in arb_node()) {
        reconcile(&old, &new);
    }

    #[test]
    fn diff_is_deterministic(old in arb_node(), new in arb_node()) {
        let mut old_arena = Arena::with_lane(DEFAULT_CAPACITY, 0, 2);
        let mut new_arena = Arena::with_lane(DEFAULT_CAPACITY, 1, 2);
        let old_root = old.build(&mut old_arena);
        let new_root = new.build(&mut new_arena);
        let first = diff(&old_arena, old_root, &new_arena, new_root);
        let second = diff(&old_arena, old_root, &new_arena, new_root);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn permutations_only_move(order in Just((0_u8..10).collect::<Vec<_>>()).prop_shuffle()) {
        let identity: Vec<u8> = (0..10).collect();
        let patches = reconcile(&keyed(&identity), &keyed(&order));
        prop_assert_eq!(patches.count(PatchKind::Replace), 0);
        prop_assert_eq!(patches.count(PatchKind::InsertChild), 0);
        prop_assert_eq!(patches.count(PatchKind::RemoveChild), 0);
        let positions: Vec<usize> = order.iter().map(|key| usize::from(*key)).collect();
        prop_assert_eq!(patches.count(PatchKind::MoveChild), order.len() - lis_len(&positions));
    }

    #[test]
    fn one_moved_key_is_one_move(len in 2_usize..12, from in 0_usize..12, to in 0_usize..12) {
        let from = from % len;
        let to = to % len;
        prop_assume!(from != to);
        #[allow(clippy::cast_possible_truncation)]
        let old: Vec<u8> = (0..len as u8).collect();
        let mut new = old.clone();
        let key = new.remove(from);
        new.insert(to, key);
        let patches = reconcile(&keyed(&old), &keyed(&new));
        prop_assert_eq!(patches.len(), 1);
        prop_assert_eq!(patches.count(PatchKind::MoveChild), 1);
    }

    #[test]
    fn runtimes_replay_identically(events in prop::collection::vec(arb_event(), 0..24)) {
        let mut a = Runtime::new().expect("runtime builds");
        let mut b = Runtime::new().expect("runtime builds");
        let mut mirror = MirrorTree::new();
        mirror.apply(a.arena(), a.patches()).expect("initial tree");
        for event in events {
            let version = a.state().version;
            let outcome_a = a.dispatch(event.clone());
            let outcome_b = b.dispatch(event);
            prop_assert_eq!(&outcome_a, &outcome_b);
            prop_assert_eq!(a.state(), b.state());
            prop_assert_eq!(a.patches(), b.patches());
            prop_assert!(a.state().version == version || a.state().version == version + 1);

            mirror.apply(a.arena(), a.patches()).expect("patches apply");
            let expected = MirrorNode::from_arena(a.arena(), a.root()).expect("tree");
            prop_assert_eq!(mirror.root(), Some(&expected));
        }
    }
}
