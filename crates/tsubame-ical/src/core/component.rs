//! iCalendar component types (RFC 5545 §3.4-3.6) and the calendar wrapper.

use std::cell::RefCell;

use tsubame_core::constants;

use super::datetime::CalDateTime;
use super::duration::Duration;
use super::property::Property;

/// Component kind for iCalendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// VCALENDAR wrapper component.
    Calendar,
    /// VEVENT component.
    Event,
    /// VTODO component.
    Todo,
    /// VJOURNAL component.
    Journal,
    /// VFREEBUSY component.
    FreeBusy,
    /// VTIMEZONE component.
    Timezone,
    /// VALARM component (nested within VEVENT/VTODO).
    Alarm,
    /// STANDARD sub-component of VTIMEZONE.
    Standard,
    /// DAYLIGHT sub-component of VTIMEZONE.
    Daylight,
    /// X-CALENDARSERVER-PERUSER overlay component.
    PerUser,
    /// X-CALENDARSERVER-PERINSTANCE block inside a per-user component.
    PerInstance,
    /// Unknown/X-component.
    Unknown,
}

impl ComponentKind {
    /// Returns the string name for this component kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "VCALENDAR",
            Self::Event => "VEVENT",
            Self::Todo => "VTODO",
            Self::Journal => "VJOURNAL",
            Self::FreeBusy => "VFREEBUSY",
            Self::Timezone => "VTIMEZONE",
            Self::Alarm => "VALARM",
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
            Self::PerUser => constants::PERUSER_COMPONENT,
            Self::PerInstance => constants::PERINSTANCE_COMPONENT,
            Self::Unknown => "X-UNKNOWN",
        }
    }

    /// Parses a component kind from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "VCALENDAR" => Self::Calendar,
            "VEVENT" => Self::Event,
            "VTODO" => Self::Todo,
            "VJOURNAL" => Self::Journal,
            "VFREEBUSY" => Self::FreeBusy,
            "VTIMEZONE" => Self::Timezone,
            "VALARM" => Self::Alarm,
            "STANDARD" => Self::Standard,
            "DAYLIGHT" => Self::Daylight,
            constants::PERUSER_COMPONENT => Self::PerUser,
            constants::PERINSTANCE_COMPONENT => Self::PerInstance,
            _ => Self::Unknown,
        }
    }

    /// Returns whether this is a schedulable component (VEVENT, VTODO, VJOURNAL).
    #[must_use]
    pub const fn is_schedulable(self) -> bool {
        matches!(self, Self::Event | Self::Todo | Self::Journal)
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An iCalendar component.
///
/// Holds an ordered multiset of properties and an ordered list of child
/// components. Each component memoizes its own serialization; the memo is
/// cleared by every mutating method and by every `&mut` accessor on the
/// access path, so a mutation reached through the owning chain invalidates
/// exactly the components whose rendered text could have changed. This is
/// the owned-tree rendition of an upward parent-pointer invalidation walk.
#[derive(Debug)]
pub struct Component {
    kind: ComponentKind,
    name: String,
    properties: Vec<Property>,
    children: Vec<Component>,
    serialization: RefCell<Option<String>>,
}

impl Clone for Component {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            name: self.name.clone(),
            properties: self.properties.clone(),
            children: self.children.clone(),
            serialization: RefCell::new(None),
        }
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        // The memo is derived state, not identity.
        self.kind == other.kind
            && self.name == other.name
            && self.properties == other.properties
            && self.children == other.children
    }
}

impl Component {
    /// Creates a new component with the given kind.
    #[must_use]
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            name: kind.as_str().to_string(),
            properties: Vec::new(),
            children: Vec::new(),
            serialization: RefCell::new(None),
        }
    }

    /// Creates a new component with a custom name (for X-components).
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        let name = name.into().to_ascii_uppercase();
        let kind = ComponentKind::parse(&name);
        Self {
            kind,
            name,
            properties: Vec::new(),
            children: Vec::new(),
            serialization: RefCell::new(None),
        }
    }

    /// Creates a VEVENT component.
    #[must_use]
    pub fn event() -> Self {
        Self::new(ComponentKind::Event)
    }

    /// Creates a VTODO component.
    #[must_use]
    pub fn todo() -> Self {
        Self::new(ComponentKind::Todo)
    }

    /// Creates a VALARM component.
    #[must_use]
    pub fn alarm() -> Self {
        Self::new(ComponentKind::Alarm)
    }

    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn invalidate(&mut self) {
        self.serialization.get_mut().take();
    }

    // --- properties ---

    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Returns the first property with the given name.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns all properties with the given name.
    #[must_use]
    pub fn get_properties(&self, name: &str) -> Vec<&Property> {
        self.properties
            .iter()
            .filter(|p| p.name.eq_ignore_ascii_case(name))
            .collect()
    }

    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.get_property(name).is_some()
    }

    /// Mutable access to the first property with the given name.
    /// Invalidates this component's serialization memo.
    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.invalidate();
        self.properties.iter_mut().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Mutable access to the full property list.
    /// Invalidates this component's serialization memo.
    pub fn properties_mut(&mut self) -> &mut Vec<Property> {
        self.invalidate();
        &mut self.properties
    }

    /// Adds a property to this component.
    pub fn add_property(&mut self, prop: Property) {
        self.invalidate();
        self.properties.push(prop);
    }

    /// Removes every property with the given name.
    pub fn remove_properties(&mut self, name: &str) {
        self.invalidate();
        self.properties.retain(|p| !p.name.eq_ignore_ascii_case(name));
    }

    /// Replaces all properties with the same name by the given one.
    pub fn replace_property(&mut self, prop: Property) {
        self.remove_properties(&prop.name.clone());
        self.add_property(prop);
    }

    // --- children ---

    #[must_use]
    pub fn children(&self) -> &[Component] {
        &self.children
    }

    /// Mutable access to the child list.
    /// Invalidates this component's serialization memo.
    pub fn children_mut(&mut self) -> &mut Vec<Component> {
        self.invalidate();
        &mut self.children
    }

    /// Adds a child component.
    pub fn add_child(&mut self, child: Component) {
        self.invalidate();
        self.children.push(child);
    }

    /// Removes children not matching the predicate.
    pub fn retain_children(&mut self, keep: impl FnMut(&Component) -> bool) {
        self.invalidate();
        self.children.retain(keep);
    }

    /// Returns children of a specific kind.
    #[must_use]
    pub fn children_of_kind(&self, kind: ComponentKind) -> Vec<&Component> {
        self.children.iter().filter(|c| c.kind == kind).collect()
    }

    /// Returns all VALARM children.
    #[must_use]
    pub fn alarms(&self) -> Vec<&Component> {
        self.children_of_kind(ComponentKind::Alarm)
    }

    // --- common property shortcuts ---

    /// Returns the UID property value if present.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.get_property("UID")?.as_text()
    }

    /// Returns the SUMMARY property value if present.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.get_property("SUMMARY")?.as_text()
    }

    /// Returns the RECURRENCE-ID value if present.
    #[must_use]
    pub fn recurrence_id(&self) -> Option<CalDateTime> {
        self.get_property("RECURRENCE-ID")?.as_caldatetime()
    }

    /// Returns the DTSTART value if present.
    #[must_use]
    pub fn dtstart(&self) -> Option<CalDateTime> {
        self.get_property("DTSTART")?.as_caldatetime()
    }

    /// Returns the DTEND (or DUE, for VTODO) value if present.
    #[must_use]
    pub fn dtend(&self) -> Option<CalDateTime> {
        let name = if self.kind == ComponentKind::Todo { "DUE" } else { "DTEND" };
        self.get_property(name)?.as_caldatetime()
    }

    /// Returns the DURATION value if present.
    #[must_use]
    pub fn duration_value(&self) -> Option<Duration> {
        self.get_property("DURATION")?.as_duration().copied()
    }

    /// Returns the SEQUENCE value (defaults to 0).
    #[must_use]
    pub fn sequence(&self) -> i32 {
        self.get_property("SEQUENCE").and_then(Property::as_integer).unwrap_or(0)
    }

    /// A master is a schedulable component without RECURRENCE-ID.
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.kind.is_schedulable() && !self.has_property("RECURRENCE-ID")
    }

    /// An override is a schedulable component carrying RECURRENCE-ID.
    #[must_use]
    pub fn is_override(&self) -> bool {
        self.kind.is_schedulable() && self.has_property("RECURRENCE-ID")
    }

    /// Serializes this component (and subtree) to iCalendar text, reusing
    /// the memo when no mutation happened since the last call.
    #[must_use]
    pub fn serialized(&self) -> String {
        if let Some(text) = self.serialization.borrow().as_ref() {
            return text.clone();
        }
        let text = crate::build::serialize_component(self);
        *self.serialization.borrow_mut() = Some(text.clone());
        text
    }

    /// Whether a serialization memo is currently present (test hook).
    #[must_use]
    pub fn serialization_cached(&self) -> bool {
        self.serialization.borrow().is_some()
    }
}

/// Top-level iCalendar object wrapping the root VCALENDAR.
///
/// Owns the instance-set memo for the recurrence engine; any mutable access
/// to the tree drops it (conservatively: the engine cannot prove a mutation
/// irrelevant to expansion).
#[derive(Debug, Clone)]
pub struct Calendar {
    root: Component,
    pub(crate) instances: Option<crate::expand::InstanceSet>,
}

impl PartialEq for Calendar {
    fn eq(&self, other: &Self) -> bool {
        // The instance-set memo is derived state, not identity.
        self.root == other.root
    }
}

impl Calendar {
    /// Creates a new empty calendar with required properties.
    #[must_use]
    pub fn new() -> Self {
        let mut root = Component::new(ComponentKind::Calendar);
        root.add_property(Property::text("VERSION", "2.0"));
        root.add_property(Property::text("PRODID", constants::PRODID));
        Self { root, instances: None }
    }

    /// Wraps an already-built VCALENDAR component.
    #[must_use]
    pub fn from_root(root: Component) -> Self {
        Self { root, instances: None }
    }

    #[must_use]
    pub fn root(&self) -> &Component {
        &self.root
    }

    /// Mutable access to the root component; drops the instance-set memo.
    pub fn root_mut(&mut self) -> &mut Component {
        self.instances = None;
        &mut self.root
    }

    /// Returns the VERSION value.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.root.get_property("VERSION")?.as_text()
    }

    /// Returns the PRODID value.
    #[must_use]
    pub fn prodid(&self) -> Option<&str> {
        self.root.get_property("PRODID")?.as_text()
    }

    /// The UID shared by the calendar's schedulable components.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.root
            .children()
            .iter()
            .find(|c| c.kind().is_schedulable())
            .and_then(Component::uid)
    }

    /// The kind of the calendar's schedulable components.
    #[must_use]
    pub fn main_component_type(&self) -> Option<ComponentKind> {
        self.root
            .children()
            .iter()
            .find(|c| c.kind().is_schedulable())
            .map(Component::kind)
    }

    /// The master component (schedulable, no RECURRENCE-ID), if any.
    #[must_use]
    pub fn master_component(&self) -> Option<&Component> {
        self.root.children().iter().find(|c| c.is_master())
    }

    /// Mutable master access; drops the instance-set memo.
    pub fn master_component_mut(&mut self) -> Option<&mut Component> {
        self.instances = None;
        self.root.children_mut().iter_mut().find(|c| c.is_master())
    }

    /// Override components in document order.
    #[must_use]
    pub fn override_components(&self) -> Vec<&Component> {
        self.root.children().iter().filter(|c| c.is_override()).collect()
    }

    /// Schedulable components (master and overrides) in document order.
    #[must_use]
    pub fn schedulable_components(&self) -> Vec<&Component> {
        self.root
            .children()
            .iter()
            .filter(|c| c.kind().is_schedulable())
            .collect()
    }

    /// Returns all VTIMEZONE components.
    #[must_use]
    pub fn timezones(&self) -> Vec<&Component> {
        self.root.children_of_kind(ComponentKind::Timezone)
    }

    /// Returns all per-user overlay components.
    #[must_use]
    pub fn per_user_components(&self) -> Vec<&Component> {
        self.root.children_of_kind(ComponentKind::PerUser)
    }

    /// Adds a schedulable/timezone/overlay child to the root.
    pub fn add_component(&mut self, component: Component) {
        self.root_mut().add_child(component);
    }

    /// Serializes to iCalendar text, reusing memos where possible.
    #[must_use]
    pub fn serialized(&self) -> String {
        self.root.serialized()
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new()
    }
}
