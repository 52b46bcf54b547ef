//! The virtual node model.
//!
//! A [`VNode`] describes one UI element for one render cycle. Nodes live in an
//! [`Arena`] and are read through [`NodeRef`], which resolves the node's key,
//! text and children against the arena that owns them.

use core::iter::FusedIterator;

use crate::arena::{Arena, NodeId, Span};

/// Kind of a UI element.
///
/// The discriminants are shared with every platform shell and must stay
/// stable.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tag {
    /// Generic layout container.
    Container = 0,
    /// Text leaf.
    Text = 1,
    /// Push button.
    Button = 2,
    /// Single line text input.
    Input = 3,
    /// Image.
    Image = 4,
    /// Hyperlink.
    Link = 5,
    /// List container.
    List = 6,
    /// Row of a list.
    ListItem = 7,
    /// Heading text.
    Heading = 8,
    /// Paragraph text.
    Paragraph = 9,
    /// Drop-down selection.
    Select = 10,
    /// Checkbox.
    Checkbox = 11,
    /// Radio button.
    Radio = 12,
    /// Multi-line text input.
    TextArea = 13,
    /// On/off switch.
    Toggle = 14,
    /// Slider.
    Slider = 15,
    /// Form grouping.
    Form = 20,
    /// Linear stack.
    Stack = 21,
    /// Grid.
    Grid = 22,
    /// Scrollable viewport.
    ScrollView = 23,
    /// Flexible space.
    Spacer = 24,
    /// Divider line.
    Divider = 25,
    /// Card surface.
    Card = 26,
    /// Navigation bar.
    NavBar = 30,
    /// Tab bar.
    TabBar = 31,
    /// Inline alert.
    Alert = 40,
    /// Transient toast.
    Toast = 41,
    /// Modal dialog.
    Modal = 42,
    /// Progress indicator.
    Progress = 43,
    /// Activity spinner.
    Spinner = 44,
    /// Badge.
    Badge = 46,
    /// Table.
    Table = 50,
    /// Avatar.
    Avatar = 51,
    /// Icon glyph.
    Icon = 52,
    /// Tooltip.
    Tooltip = 54,
    /// Host-defined element.
    Custom = 255,
}

impl Tag {
    /// Decodes a raw tag value.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Container,
            1 => Self::Text,
            2 => Self::Button,
            3 => Self::Input,
            4 => Self::Image,
            5 => Self::Link,
            6 => Self::List,
            7 => Self::ListItem,
            8 => Self::Heading,
            9 => Self::Paragraph,
            10 => Self::Select,
            11 => Self::Checkbox,
            12 => Self::Radio,
            13 => Self::TextArea,
            14 => Self::Toggle,
            15 => Self::Slider,
            20 => Self::Form,
            21 => Self::Stack,
            22 => Self::Grid,
            23 => Self::ScrollView,
            24 => Self::Spacer,
            25 => Self::Divider,
            26 => Self::Card,
            30 => Self::NavBar,
            31 => Self::TabBar,
            40 => Self::Alert,
            41 => Self::Toast,
            42 => Self::Modal,
            43 => Self::Progress,
            44 => Self::Spinner,
            46 => Self::Badge,
            50 => Self::Table,
            51 => Self::Avatar,
            52 => Self::Icon,
            54 => Self::Tooltip,
            255 => Self::Custom,
            _ => return None,
        })
    }

    /// Raw tag value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Tags whose nodes carry text and must not carry children.
    #[must_use]
    pub const fn is_text_leaf(self) -> bool {
        matches!(self, Self::Text | Self::Heading | Self::Paragraph)
    }
}

/// RGBA color with 8 bits per channel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// Opaque color from its channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    /// Color from a packed `0xRRGGBBAA` value.
    #[must_use]
    pub const fn from_rgba_u32(value: u32) -> Self {
        let [r, g, b, a] = value.to_be_bytes();
        Self { r, g, b, a }
    }

    /// Packs the color as `0xRRGGBBAA`.
    #[must_use]
    pub const fn to_rgba_u32(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }
}

/// Font weight.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FontWeight {
    /// Regular weight.
    #[default]
    Regular = 0,
    /// Medium weight.
    Medium = 1,
    /// Bold weight.
    Bold = 2,
}

/// Main axis of a container.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Children flow top to bottom.
    #[default]
    Vertical = 0,
    /// Children flow leading to trailing.
    Horizontal = 1,
}

/// Cross-axis alignment of a container's children.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Alignment {
    /// Leading edge.
    #[default]
    Start = 0,
    /// Centered.
    Center = 1,
    /// Trailing edge.
    End = 2,
    /// Stretched to fill.
    Fill = 3,
}

bitflags::bitflags! {
    /// Boolean attributes of an element.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct PropFlags: u32 {
        /// The element ignores input.
        const DISABLED = 1;
        /// Checkbox or toggle is on.
        const CHECKED = 1 << 1;
        /// The element is not displayed.
        const HIDDEN = 1 << 2;
        /// Disclosure is expanded.
        const EXPANDED = 1 << 3;
        /// The element has input focus.
        const FOCUSED = 1 << 4;
        /// The element is the current selection.
        const SELECTED = 1 << 5;
    }
}

/// Style and attribute fields of a node.
///
/// A plain value: two nodes need an `UpdateProps` patch exactly when their
/// props compare unequal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Props {
    /// Background fill.
    pub background: Option<Color>,
    /// Foreground (text/icon) color.
    pub foreground: Option<Color>,
    /// Uniform padding in points.
    pub padding: u16,
    /// Spacing between children in points.
    pub spacing: u16,
    /// Font size in points, `0` for the platform default.
    pub font_size: u16,
    /// Font weight.
    pub font_weight: FontWeight,
    /// Main axis for containers.
    pub direction: Direction,
    /// Cross-axis alignment for containers.
    pub alignment: Alignment,
    /// Boolean attributes.
    pub flags: PropFlags,
}

impl Props {
    /// Props with every field at its default.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            background: None,
            foreground: None,
            padding: 0,
            spacing: 0,
            font_size: 0,
            font_weight: FontWeight::Regular,
            direction: Direction::Vertical,
            alignment: Alignment::Start,
            flags: PropFlags::empty(),
        }
    }

    /// Sets the background color.
    #[must_use]
    pub const fn background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    /// Sets the foreground color.
    #[must_use]
    pub const fn foreground(mut self, color: Color) -> Self {
        self.foreground = Some(color);
        self
    }

    /// Sets the padding.
    #[must_use]
    pub const fn padding(mut self, padding: u16) -> Self {
        self.padding = padding;
        self
    }

    /// Sets the spacing between children.
    #[must_use]
    pub const fn spacing(mut self, spacing: u16) -> Self {
        self.spacing = spacing;
        self
    }

    /// Sets the font size and weight.
    #[must_use]
    pub const fn font(mut self, size: u16, weight: FontWeight) -> Self {
        self.font_size = size;
        self.font_weight = weight;
        self
    }

    /// Sets the main axis.
    #[must_use]
    pub const fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the cross-axis alignment.
    #[must_use]
    pub const fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Adds or removes flags.
    #[must_use]
    pub const fn flag(mut self, flag: PropFlags, on: bool) -> Self {
        self.flags = if on {
            self.flags.union(flag)
        } else {
            self.flags.difference(flag)
        };
        self
    }
}

/// Arena record of a single node.
///
/// Strings and children are stored as ranges into the owning arena; read
/// them through [`NodeRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VNode {
    pub(crate) tag: Tag,
    pub(crate) key: Option<Span>,
    pub(crate) props: Props,
    pub(crate) text: Option<Span>,
    pub(crate) children: Span,
}

/// Borrowed view of a node resolved against its arena.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    arena: &'a Arena,
    id: NodeId,
    node: &'a VNode,
}

impl<'a> NodeRef<'a> {
    pub(crate) const fn new(arena: &'a Arena, id: NodeId, node: &'a VNode) -> Self {
        Self { arena, id, node }
    }

    /// Handle of this node.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Element kind.
    #[must_use]
    pub const fn tag(&self) -> Tag {
        self.node.tag
    }

    /// Style and attribute fields.
    #[must_use]
    pub const fn props(&self) -> &'a Props {
        &self.node.props
    }

    /// Sibling-unique identity, if any.
    #[must_use]
    pub fn key(&self) -> Option<&'a str> {
        self.node.key.map(|span| self.arena.str(span))
    }

    /// Leaf text payload, if any.
    #[must_use]
    pub fn text(&self) -> Option<&'a str> {
        self.node.text.map(|span| self.arena.str(span))
    }

    /// Handles of the children, in order.
    #[must_use]
    pub fn child_ids(&self) -> &'a [NodeId] {
        self.arena.child_ids(self.node.children)
    }

    /// Number of children.
    #[must_use]
    pub const fn child_count(&self) -> usize {
        self.node.children.len as usize
    }

    /// Child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<Self> {
        let id = *self.child_ids().get(index)?;
        self.arena.get(id).ok()
    }

    /// Iterates over the children.
    #[must_use]
    pub fn children(&self) -> Children<'a> {
        Children {
            arena: self.arena,
            ids: self.child_ids().iter(),
        }
    }

    /// Returns `true` when a text-leaf tag carries children, a shape the
    /// reconciler refuses to patch in place.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        self.node.tag.is_text_leaf() && !self.node.children.is_empty()
    }

    pub(crate) const fn record(&self) -> &'a VNode {
        self.node
    }

    pub(crate) const fn arena(&self) -> &'a Arena {
        self.arena
    }
}

/// Iterator over the children of a [`NodeRef`].
#[derive(Debug, Clone)]
pub struct Children<'a> {
    arena: &'a Arena,
    ids: core::slice::Iter<'a, NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.ids.find_map(|id| self.arena.get(*id).ok())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ids.len()))
    }
}

impl FusedIterator for Children<'_> {}
