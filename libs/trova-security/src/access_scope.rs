use uuid::Uuid;

/// A row property the policy compiler can constrain.
///
/// Closed set: adding a variant means teaching the data-access layer a new
/// column binding, so the compiler can never emit a filter the query side
/// does not understand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RowProperty {
    /// Owning subject (the profile owner for profile-scoped rows).
    Owner,
    /// Row identity, the primary key.
    ResourceId,
    /// Row visibility (`private` / `public`).
    Visibility,
    /// Publish status (`draft` / `published`).
    PublishStatus,
    /// Conversation reference carried by message rows.
    Conversation,
    /// Organization reference carried by membership and invitation rows.
    Org,
    /// The blocking side of a block-list row.
    Blocker,
    /// The seeker side of a match row.
    Seeker,
    /// The poster side of a match row.
    Poster,
}

impl RowProperty {
    /// Column name the data-access layer binds this property to.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::Owner => "owner_id",
            Self::ResourceId => "id",
            Self::Visibility => "visibility",
            Self::PublishStatus => "status",
            Self::Conversation => "conversation_id",
            Self::Org => "org_id",
            Self::Blocker => "blocker_id",
            Self::Seeker => "seeker_id",
            Self::Poster => "poster_id",
        }
    }
}

/// A scalar a scope filter compares against.
///
/// Id-valued properties carry UUIDs; the status-like properties
/// (`Visibility`, `PublishStatus`) carry their wire strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeValue {
    /// UUID value (subject IDs, resource IDs, conversation IDs, etc.)
    Uuid(Uuid),
    /// String value (visibility, publish status).
    String(String),
}

impl ScopeValue {
    /// The UUID inside, if this is a UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(u) => Some(*u),
            Self::String(_) => None,
        }
    }
}

impl From<Uuid> for ScopeValue {
    #[inline]
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<String> for ScopeValue {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for ScopeValue {
    #[inline]
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

/// A single typed predicate on a row property.
///
/// - [`ScopeFilter::Eq`] — equality (`property = value`)
/// - [`ScopeFilter::In`] — set membership (`property IN (values)`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeFilter {
    /// Equality: `property = value`.
    Eq {
        /// The constrained row property.
        property: RowProperty,
        /// The value to match.
        value: ScopeValue,
    },
    /// Set membership: `property IN (values)`.
    In {
        /// The constrained row property.
        property: RowProperty,
        /// The set of values to match against.
        values: Vec<ScopeValue>,
    },
}

impl ScopeFilter {
    /// Create an equality filter (`property = value`).
    #[must_use]
    pub fn eq(property: RowProperty, value: impl Into<ScopeValue>) -> Self {
        Self::Eq {
            property,
            value: value.into(),
        }
    }

    /// Create a set membership filter from UUID values.
    #[must_use]
    pub fn in_uuids(property: RowProperty, ids: Vec<Uuid>) -> Self {
        Self::In {
            property,
            values: ids.into_iter().map(ScopeValue::Uuid).collect(),
        }
    }

    /// The constrained row property.
    #[must_use]
    pub fn property(&self) -> RowProperty {
        match self {
            Self::Eq { property, .. } | Self::In { property, .. } => *property,
        }
    }

    /// Whether a row carrying `value` for this filter's property passes.
    #[must_use]
    pub fn matches(&self, value: &ScopeValue) -> bool {
        match self {
            Self::Eq { value: v, .. } => v == value,
            Self::In { values, .. } => values.contains(value),
        }
    }
}

/// A conjunction (AND) of scope filters — one access path.
///
/// All filters within a constraint must match simultaneously for a row
/// to be accessible via this path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeConstraint {
    filters: Vec<ScopeFilter>,
}

impl ScopeConstraint {
    /// Create a new scope constraint from a list of filters.
    #[must_use]
    pub fn new(filters: Vec<ScopeFilter>) -> Self {
        Self { filters }
    }

    /// The filters in this constraint (AND-ed together).
    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[ScopeFilter] {
        &self.filters
    }
}

/// A disjunction (OR) of scope constraints defining which rows are readable.
///
/// Each constraint is an independent access path (OR-ed). Filters within a
/// constraint are AND-ed. An unconstrained scope bypasses row-level filtering.
/// The deny-all scope is the "silently empty result" for list reads: the
/// caller applies it and gets zero rows, never an error.
///
/// # Examples
///
/// ```
/// use trova_security::{AccessScope, RowProperty, ScopeConstraint, ScopeFilter};
/// use uuid::Uuid;
///
/// // deny-all (default)
/// let scope = AccessScope::deny_all();
/// assert!(scope.is_deny_all());
///
/// // rows owned by one subject
/// let owner = Uuid::new_v4();
/// let scope = AccessScope::from_constraints(vec![ScopeConstraint::new(vec![
///     ScopeFilter::eq(RowProperty::Owner, owner),
/// ])]);
/// assert!(!scope.is_deny_all());
/// assert!(scope.contains_uuid(RowProperty::Owner, owner));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessScope {
    constraints: Vec<ScopeConstraint>,
    unconstrained: bool,
}

impl Default for AccessScope {
    /// Default is deny-all: no constraints and not unconstrained.
    fn default() -> Self {
        Self::deny_all()
    }
}

impl AccessScope {
    /// Create an access scope from a list of constraints (OR-ed).
    #[must_use]
    pub fn from_constraints(constraints: Vec<ScopeConstraint>) -> Self {
        Self {
            constraints,
            unconstrained: false,
        }
    }

    /// Create an "allow all" (unconstrained) scope.
    ///
    /// A legitimate decision with no row-level filtering, not a bypass.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            constraints: Vec::new(),
            unconstrained: true,
        }
    }

    /// Create a "deny all" scope (no access; list reads come back empty).
    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            constraints: Vec::new(),
            unconstrained: false,
        }
    }

    /// The constraints in this scope (OR-ed).
    #[inline]
    #[must_use]
    pub fn constraints(&self) -> &[ScopeConstraint] {
        &self.constraints
    }

    /// Returns `true` if this scope is unconstrained (allow-all).
    #[inline]
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.unconstrained
    }

    /// Returns `true` if this scope denies all access.
    ///
    /// A scope is deny-all when it is not unconstrained and has no constraints.
    #[must_use]
    pub fn is_deny_all(&self) -> bool {
        !self.unconstrained && self.constraints.is_empty()
    }

    /// Check if any constraint has a filter matching the given property and value.
    #[must_use]
    pub fn contains_value(&self, property: RowProperty, value: &ScopeValue) -> bool {
        self.constraints.iter().any(|c| {
            c.filters()
                .iter()
                .any(|f| f.property() == property && f.matches(value))
        })
    }

    /// Check if any constraint has a filter matching the given property and UUID.
    #[must_use]
    pub fn contains_uuid(&self, property: RowProperty, id: Uuid) -> bool {
        self.contains_value(property, &ScopeValue::Uuid(id))
    }

    /// Check if any constraint references the given property.
    #[must_use]
    pub fn has_property(&self, property: RowProperty) -> bool {
        self.constraints
            .iter()
            .any(|c| c.filters().iter().any(|f| f.property() == property))
    }
}
