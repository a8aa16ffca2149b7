//! Class-name and annotation predicates used to pick holder fields.

use strum_macros::{Display, EnumIter};

use crate::config::{MatchMode, TransformerConfig};

/// The two annotations marking fields whose values are injected after
/// registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum HolderMarker {
    /// Affects only the annotated field.
    ObjectHolder,
    /// Escalates to every field of the declaring class.
    ItemStackHolder,
}

/// Compares a raw annotation descriptor with a marker fragment.
pub trait DescriptorMatch: Send + Sync {
    fn matches(&self, descriptor: &str, fragment: &str) -> bool;
}

/// Plain substring search. A crafted unrelated annotation whose descriptor
/// happens to contain the fragment matches too.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatch;

impl DescriptorMatch for SubstringMatch {
    fn matches(&self, descriptor: &str, fragment: &str) -> bool {
        descriptor.contains(fragment)
    }
}

/// `L<fragment>;` and nothing else, with `$` accepted wherever the fragment
/// has `/` so nested annotation types match either spelling.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl DescriptorMatch for ExactMatch {
    fn matches(&self, descriptor: &str, fragment: &str) -> bool {
        let Some(internal) = descriptor
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
        else {
            return false;
        };
        internal.len() == fragment.len()
            && internal
                .bytes()
                .zip(fragment.bytes())
                .all(|(a, b)| a == b || (a == b'$' && b == b'/'))
    }
}

/// Read-only predicate set built from a [`TransformerConfig`].
pub struct HolderMatcher {
    forced_classes: Vec<String>,
    object_holder: String,
    item_stack_holder: String,
    strategy: Box<dyn DescriptorMatch>,
}

impl std::fmt::Debug for HolderMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HolderMatcher")
            .field("forced_classes", &self.forced_classes)
            .field("object_holder", &self.object_holder)
            .field("item_stack_holder", &self.item_stack_holder)
            .finish_non_exhaustive()
    }
}

impl Default for HolderMatcher {
    fn default() -> Self {
        Self::new(&TransformerConfig::default())
    }
}

impl HolderMatcher {
    pub fn new(config: &TransformerConfig) -> Self {
        let strategy: Box<dyn DescriptorMatch> = match config.match_mode {
            MatchMode::Substring => Box::new(SubstringMatch),
            MatchMode::Exact => Box::new(ExactMatch),
        };
        Self::with_strategy(config, strategy)
    }

    pub fn with_strategy(config: &TransformerConfig, strategy: Box<dyn DescriptorMatch>) -> Self {
        Self {
            forced_classes: config.forced_classes.clone(),
            object_holder: config.object_holder_marker.clone(),
            item_stack_holder: config.item_stack_holder_marker.clone(),
            strategy,
        }
    }

    /// True for the allow-listed classes that get whole-class treatment.
    /// `name` is the dotted, deobfuscated name.
    pub fn is_forced_transform_class(&self, name: &str) -> bool {
        self.forced_classes.iter().any(|forced| forced == name)
    }

    fn fragment(&self, marker: HolderMarker) -> &str {
        match marker {
            HolderMarker::ObjectHolder => &self.object_holder,
            HolderMarker::ItemStackHolder => &self.item_stack_holder,
        }
    }

    /// Which marker an annotation descriptor carries. The object holder is
    /// tested first.
    pub fn holder_marker(&self, descriptor: &str) -> Option<HolderMarker> {
        [HolderMarker::ObjectHolder, HolderMarker::ItemStackHolder]
            .into_iter()
            .find(|marker| self.strategy.matches(descriptor, self.fragment(*marker)))
    }

    pub fn has_marker_annotation<'a>(
        &self,
        descriptors: impl IntoIterator<Item = &'a str>,
        marker: HolderMarker,
    ) -> bool {
        descriptors
            .into_iter()
            .any(|descriptor| self.strategy.matches(descriptor, self.fragment(marker)))
    }

    pub fn has_any_marker<'a>(&self, descriptors: impl IntoIterator<Item = &'a str>) -> bool {
        descriptors
            .into_iter()
            .any(|descriptor| self.holder_marker(descriptor).is_some())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    const OBJECT_HOLDER: &str = "Lcpw/mods/fml/common/registry/GameRegistry/ObjectHolder;";
    const ITEM_STACK_HOLDER: &str = "Lcpw/mods/fml/common/registry/GameRegistry/ItemStackHolder;";
    const NESTED_OBJECT_HOLDER: &str = "Lcpw/mods/fml/common/registry/GameRegistry$ObjectHolder;";

    #[test]
    fn allow_list_is_exact() {
        let matcher = HolderMatcher::default();
        assert!(matcher.is_forced_transform_class("net.minecraft.init.Blocks"));
        assert!(matcher.is_forced_transform_class("net.minecraft.init.Items"));
        assert!(!matcher.is_forced_transform_class("net.minecraft.init.Bootstrap"));
        assert!(!matcher.is_forced_transform_class("net/minecraft/init/Blocks"));
    }

    #[test]
    fn substring_matching_identifies_markers() {
        let matcher = HolderMatcher::default();
        assert_eq!(
            matcher.holder_marker(OBJECT_HOLDER),
            Some(HolderMarker::ObjectHolder)
        );
        assert_eq!(
            matcher.holder_marker(ITEM_STACK_HOLDER),
            Some(HolderMarker::ItemStackHolder)
        );
        assert_eq!(matcher.holder_marker("Ljava/lang/Deprecated;"), None);
        // A crafted descriptor that merely contains the fragment still hits.
        assert_eq!(
            matcher.holder_marker("Lcom/evil/cpw/mods/fml/common/registry/GameRegistry/ObjectHolderFake;"),
            Some(HolderMarker::ObjectHolder)
        );
        assert!(matcher.has_marker_annotation(
            ["Ljava/lang/Deprecated;", ITEM_STACK_HOLDER],
            HolderMarker::ItemStackHolder
        ));
        assert!(!matcher.has_marker_annotation([OBJECT_HOLDER], HolderMarker::ItemStackHolder));
    }

    #[test]
    fn exact_matching_rejects_lookalikes() {
        let config = TransformerConfig {
            match_mode: MatchMode::Exact,
            ..Default::default()
        };
        let matcher = HolderMatcher::new(&config);
        assert_eq!(
            matcher.holder_marker(OBJECT_HOLDER),
            Some(HolderMarker::ObjectHolder)
        );
        assert_eq!(
            matcher.holder_marker(NESTED_OBJECT_HOLDER),
            Some(HolderMarker::ObjectHolder)
        );
        assert_eq!(
            matcher.holder_marker("Lcom/evil/cpw/mods/fml/common/registry/GameRegistry/ObjectHolderFake;"),
            None
        );
        assert_eq!(matcher.holder_marker("cpw/mods/fml/common/registry/GameRegistry/ObjectHolder"), None);
    }

    #[test]
    fn substring_does_not_see_nested_spelling() {
        let matcher = HolderMatcher::default();
        assert_eq!(matcher.holder_marker(NESTED_OBJECT_HOLDER), None);
    }

    #[test]
    fn every_marker_has_a_fragment() {
        let matcher = HolderMatcher::default();
        for marker in HolderMarker::iter() {
            assert!(!matcher.fragment(marker).is_empty(), "{marker}");
        }
    }
}
