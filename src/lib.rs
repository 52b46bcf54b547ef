#![doc = include_str!("../README.md")]

pub use zylix_core::*;

pub mod prelude {
    //! The types needed to drive a runtime and apply its patches.
    //!
    //! ```rust
    //! use zylix::prelude::*;
    //!
    //! fn label(state: &State, tree: &mut TreeBuilder<'_>) {
    //!     tree.leaf(Tag::Text, if state.app.counter > 0 { "positive" } else { "zero" });
    //! }
    //!
    //! let mut runtime = Runtime::builder().view(label).build().expect("runtime");
    //! runtime.dispatch(Event::Increment).expect("dispatch");
    //! ```
    pub use zylix_core::{
        Event, MirrorTree, NodeId, NodeRef, Outcome, Patch, PatchKind, PatchList, Props, Runtime,
        RuntimeConfig, State, Tag, TreeBuilder, ViewBuilder,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn prelude_drives_a_full_cycle() {
        let mut runtime = Runtime::new().expect("default runtime");
        let mut mirror = MirrorTree::new();
        mirror
            .apply(runtime.arena(), runtime.patches())
            .expect("initial tree applies");

        for event in [
            Event::TodoAdd("write docs".into()),
            Event::TodoAdd("ship".into()),
            Event::TodoToggle(1),
            Event::SetFilter(crate::Filter::Active),
        ] {
            runtime.dispatch(event).expect("dispatch");
            mirror
                .apply(runtime.arena(), runtime.patches())
                .expect("patches apply");
        }

        let expected =
            crate::MirrorNode::from_arena(runtime.arena(), runtime.root()).expect("committed tree");
        assert_eq!(mirror.root(), Some(&expected));
        assert_eq!(runtime.state().version, 4);
    }
}
