//! Views turn a [`State`] into a virtual tree.

use crate::{
    builder::TreeBuilder,
    state::{Filter, State},
    vnode::{Color, Direction, FontWeight, PropFlags, Props, Tag},
};

/// Builds the virtual tree for a state.
///
/// A view must be a pure function of the state: the render loop relies on
/// identical states producing identical trees.
pub trait ViewBuilder {
    /// Describes the UI for `state` into `tree`, producing exactly one root.
    fn build(&self, state: &State, tree: &mut TreeBuilder<'_>);
}

impl<F> ViewBuilder for F
where
    F: Fn(&State, &mut TreeBuilder<'_>),
{
    fn build(&self, state: &State, tree: &mut TreeBuilder<'_>) {
        self(state, tree);
    }
}

const ACCENT: Color = Color::rgb(0x25, 0x63, 0xeb);
const DANGER: Color = Color::rgb(0xdc, 0x26, 0x26);

/// The built-in view: a counter and a filterable todo list.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultView;

impl ViewBuilder for DefaultView {
    fn build(&self, state: &State, tree: &mut TreeBuilder<'_>) {
        let app = &state.app;
        tree.open(Tag::Container)
            .key("root")
            .props(Props::new().padding(16).spacing(12));

        tree.open(Tag::NavBar).key("nav");
        if state.screen == 0 {
            tree.text("Zylix");
        } else {
            tree.text_fmt(format_args!("Screen {}", state.screen));
        }
        tree.close();

        tree.open(Tag::Container)
            .key("counter")
            .props(Props::new().direction(Direction::Horizontal).spacing(8));
        tree.open(Tag::Button).key("decrement").text("-").close();
        tree.open(Tag::Text)
            .key("count")
            .props(Props::new().font(32, FontWeight::Bold))
            .text_fmt(format_args!("{}", app.counter))
            .close();
        tree.open(Tag::Button).key("increment").text("+").close();
        tree.close();

        tree.open(Tag::Container).key("todos");
        tree.open(Tag::Input).key("input").text(&app.input).close();
        tree.open(Tag::List).key("list");
        for todo in app.visible_todos() {
            tree.open(Tag::ListItem)
                .key_fmt(format_args!("todo-{}", todo.id))
                .props(Props::new().flag(PropFlags::CHECKED, todo.completed))
                .text(&todo.text)
                .close();
        }
        tree.close();
        let left = app.active_count();
        tree.open(Tag::Text)
            .key("left")
            .text_fmt(format_args!(
                "{left} {} left",
                if left == 1 { "item" } else { "items" }
            ))
            .close();
        tree.open(Tag::Container)
            .key("filters")
            .props(Props::new().direction(Direction::Horizontal));
        for filter in Filter::ALL {
            let selected = filter == app.filter;
            let mut props = Props::new().flag(PropFlags::SELECTED, selected);
            if selected {
                props = props.foreground(ACCENT);
            }
            tree.open(Tag::Button)
                .key(filter.label())
                .props(props)
                .text(filter.label())
                .close();
        }
        tree.close();
        tree.close();

        if let Some(message) = &state.error_message {
            tree.open(Tag::Alert)
                .key("error")
                .props(Props::new().foreground(DANGER))
                .text(message)
                .close();
        }
        tree.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arena::{Arena, DEFAULT_CAPACITY},
        event::Event,
        state::{Limits, Store},
    };

    fn render(state: &State, arena: &mut Arena) -> crate::arena::NodeId {
        let mut tree = arena.builder();
        DefaultView.build(state, &mut tree);
        tree.finish().expect("default view builds")
    }

    #[test]
    fn renders_counter_and_filtered_todos() {
        let mut store = Store::new(Limits::default());
        store.dispatch(&Event::Increment);
        store.dispatch(&Event::TodoAdd("a".into()));
        store.dispatch(&Event::TodoAdd("b".into()));
        store.dispatch(&Event::TodoToggle(1));
        store.dispatch(&Event::SetFilter(Filter::Active));

        let mut arena = Arena::new(DEFAULT_CAPACITY);
        let root = render(store.state(), &mut arena);
        let root = arena.get(root).expect("root resolves");
        let keys: std::vec::Vec<_> = root.children().filter_map(|c| c.key()).collect();
        assert_eq!(keys, ["nav", "counter", "todos"]);

        let count = root.child(1).and_then(|c| c.child(1)).expect("count text");
        assert_eq!(count.text(), Some("1"));

        let todos = root.child(2).expect("todo section");
        let list = todos.child(1).expect("list");
        let items: std::vec::Vec<_> = list.children().filter_map(|c| c.key()).collect();
        assert_eq!(items, ["todo-2"]);
        assert_eq!(todos.child(2).and_then(|c| c.text()), Some("1 item left"));

        let active = todos.child(3).and_then(|f| f.child(1)).expect("active filter");
        assert!(active.props().flags.contains(PropFlags::SELECTED));
    }

    #[test]
    fn error_message_adds_an_alert() {
        let mut store = Store::new(Limits {
            max_todos: 0,
            ..Limits::default()
        });
        store.dispatch(&Event::TodoAdd("x".into()));
        let mut arena = Arena::new(DEFAULT_CAPACITY);
        let root = render(store.state(), &mut arena);
        let root = arena.get(root).expect("root resolves");
        let alert = root.child(3).expect("alert");
        assert_eq!(alert.tag(), Tag::Alert);
        assert_eq!(alert.text(), Some("todo list is full"));
    }

    fn version_label(state: &State, tree: &mut TreeBuilder<'_>) {
        tree.open(Tag::Text)
            .text_fmt(format_args!("v{}", state.version))
            .close();
    }

    #[test]
    fn functions_are_views() {
        let mut arena = Arena::new(DEFAULT_CAPACITY);
        let mut tree = arena.builder();
        version_label.build(&State::default(), &mut tree);
        let root = tree.finish().expect("function view builds");
        assert_eq!(arena.get(root).ok().and_then(|n| n.text()), Some("v0"));
    }
}
