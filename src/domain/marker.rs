//! The one attribute type that marks a class as designed for inheritance

/// Conventional suffix C# allows attribute references to omit
pub const ATTRIBUTE_SUFFIX: &str = "Attribute";

/// Identity of the marker attribute: a namespace path plus a short type name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerIdentity {
    /// Short name as written in source, without the `Attribute` suffix
    pub short_name: &'static str,
    /// Dotted namespace the genuine marker type is declared in
    pub namespace: &'static str,
}

/// `ProductiveRage.SealedClassVerification.DesignedForInheritance`
pub const DESIGNED_FOR_INHERITANCE: MarkerIdentity = MarkerIdentity {
    short_name: "DesignedForInheritance",
    namespace: "ProductiveRage.SealedClassVerification",
};

impl MarkerIdentity {
    /// Whether a written name segment matches the short name, with or without the suffix
    pub fn matches_short_name(&self, segment: &str) -> bool {
        segment == self.short_name
            || segment
                .strip_suffix(ATTRIBUTE_SUFFIX)
                .is_some_and(|stem| stem == self.short_name)
    }

    /// Declared type name, including the suffix
    pub fn type_name(&self) -> String {
        format!("{}{}", self.short_name, ATTRIBUTE_SUFFIX)
    }

    /// Fully-qualified declared type name
    pub fn full_type_name(&self) -> String {
        format!("{}.{}", self.namespace, self.type_name())
    }

    /// Attribute list text inserted by the AddMarker fix
    pub fn attribute_list_text(&self) -> String {
        format!("[{}]", self.short_name)
    }

    /// Using directive text inserted by the AddMarker fix
    pub fn using_directive_text(&self) -> String {
        format!("using {};", self.namespace)
    }
}

impl Default for MarkerIdentity {
    fn default() -> Self {
        DESIGNED_FOR_INHERITANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_variants() {
        let marker = DESIGNED_FOR_INHERITANCE;
        assert!(marker.matches_short_name("DesignedForInheritance"));
        assert!(marker.matches_short_name("DesignedForInheritanceAttribute"));
        assert!(!marker.matches_short_name("designedForInheritance"));
        assert!(!marker.matches_short_name("DesignedForInheritanceAttributeAttribute"));
        assert!(!marker.matches_short_name("Attribute"));
    }

    #[test]
    fn test_generated_text() {
        let marker = DESIGNED_FOR_INHERITANCE;
        assert_eq!(
            marker.full_type_name(),
            "ProductiveRage.SealedClassVerification.DesignedForInheritanceAttribute"
        );
        assert_eq!(marker.attribute_list_text(), "[DesignedForInheritance]");
        assert_eq!(
            marker.using_directive_text(),
            "using ProductiveRage.SealedClassVerification;"
        );
    }
}
