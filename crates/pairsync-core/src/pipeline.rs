//! Data application pipeline
//!
//! Incoming character data replaces the matching slice of a pair's
//! [`LastReceivedData`] wholesale. Per-recipient maps (alias data and shock
//! permissions) are narrowed to the entry addressed to the requesting client
//! before storing; a missing entry stores the default so another
//! recipient's data is never kept.

use std::collections::HashMap;

use tracing::debug;

use crate::error::PairResult;
use crate::identity::Identity;
use crate::notifier::PairNotification;
use crate::registry::PairRegistry;
use crate::types::{CompositeData, DataKind, DataPayload, LastReceivedData};

/// Pick the entry addressed to `client`, or the default if there is none.
///
/// An exact uid key wins; otherwise the smallest key matching without case
/// is used, so the pick never depends on map iteration order.
pub fn extract_for_recipient<T>(by_recipient: &HashMap<String, T>, client: &Identity) -> T
where
    T: Default + Clone,
{
    if let Some(value) = by_recipient.get(client.uid()) {
        return value.clone();
    }
    by_recipient
        .iter()
        .filter(|(recipient, _)| client.matches_uid(recipient))
        .min_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

/// Store every slice present in `composite`; returns the kinds applied
pub fn merge_composite(
    data: &mut LastReceivedData,
    composite: &CompositeData,
    client: &Identity,
) -> Vec<DataKind> {
    let mut applied = Vec::new();

    if let Some(appearance) = &composite.appearance {
        data.appearance = Some(appearance.clone());
        applied.push(DataKind::Appearance);
    }
    if let Some(wardrobe) = &composite.wardrobe {
        data.wardrobe = Some(wardrobe.clone());
        applied.push(DataKind::Wardrobe);
    }
    if let Some(by_recipient) = &composite.alias_data_by_recipient {
        data.alias = Some(extract_for_recipient(by_recipient, client));
        applied.push(DataKind::Alias);
    }
    if let Some(toybox) = &composite.toybox {
        data.toybox = Some(toybox.clone());
        applied.push(DataKind::Toybox);
    }
    if let Some(by_recipient) = &composite.shock_permissions_by_recipient {
        data.shock_permissions = Some(extract_for_recipient(by_recipient, client));
        applied.push(DataKind::ShockPermissions);
    }

    if !applied.is_empty() {
        data.updated_at = Some(chrono::Utc::now().timestamp_millis());
    }
    applied
}

/// Store a single slice
pub fn merge_partial(data: &mut LastReceivedData, payload: DataPayload) -> DataKind {
    let kind = payload.kind();
    match payload {
        DataPayload::Appearance(appearance) => data.appearance = Some(appearance),
        DataPayload::Wardrobe(wardrobe) => data.wardrobe = Some(wardrobe),
        DataPayload::Alias(alias) => data.alias = Some(alias),
        DataPayload::Toybox(toybox) => data.toybox = Some(toybox),
        DataPayload::ShockPermissions(shock) => data.shock_permissions = Some(shock),
    }
    data.updated_at = Some(chrono::Utc::now().timestamp_millis());
    kind
}

fn received(identity: &Identity, kind: DataKind) -> PairNotification {
    PairNotification::Informational {
        identity: identity.clone(),
        kind,
        description: kind.received_description(),
    }
}

impl PairRegistry {
    /// Apply a composite data delivery for `identity`.
    ///
    /// `client` is the requesting client's own identity, used to pick its
    /// entries out of the per-recipient maps.
    pub fn receive_composite_data(
        &self,
        identity: &Identity,
        client: &Identity,
        composite: &CompositeData,
    ) -> PairResult<Vec<DataKind>> {
        let handle = self.lookup(identity)?;
        let applied = merge_composite(&mut handle.write().data, composite, client);

        debug!(identity = %identity, slices = applied.len(), "Applied composite data");
        self.notifier()
            .publish_all(applied.iter().map(|kind| received(identity, *kind)));
        Ok(applied)
    }

    /// Apply a single-slice data delivery for `identity`
    pub fn receive_partial_data(
        &self,
        identity: &Identity,
        payload: DataPayload,
    ) -> PairResult<DataKind> {
        let handle = self.lookup(identity)?;
        let kind = merge_partial(&mut handle.write().data, payload);

        debug!(identity = %identity, kind = %kind, "Applied partial data");
        self.notifier().publish(received(identity, kind));
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::drain;
    use crate::types::{
        AliasData, AppearanceData, GagSlot, RelationshipStatus, ShockPermissions, ToyboxData,
    };

    fn alias_named(name: &str) -> AliasData {
        AliasData {
            has_name_stored: true,
            listener_name: name.to_string(),
            triggers: Vec::new(),
        }
    }

    #[test]
    fn test_extract_only_own_entry() {
        let mut map = HashMap::new();
        map.insert("ClientA".to_string(), alias_named("for-a"));
        map.insert("clientB".to_string(), alias_named("for-b"));

        let mine = extract_for_recipient(&map, &Identity::new("clienta"));
        assert_eq!(mine.listener_name, "for-a");

        let missing = extract_for_recipient(&map, &Identity::new("clientC"));
        assert_eq!(missing, AliasData::default());
    }

    #[test]
    fn test_extract_prefers_exact_key() {
        // Fresh maps get fresh hash seeds, so iteration order varies
        for _ in 0..8 {
            let mut map = HashMap::new();
            map.insert("ClientA".to_string(), alias_named("upper"));
            map.insert("clienta".to_string(), alias_named("lower"));
            map.insert("CLIENTA".to_string(), alias_named("shout"));

            assert_eq!(extract_for_recipient(&map, &Identity::new("ClientA")).listener_name, "upper");
            assert_eq!(extract_for_recipient(&map, &Identity::new("clienta")).listener_name, "lower");
            // No exact key: the smallest case-insensitive match
            assert_eq!(extract_for_recipient(&map, &Identity::new("cLiEnTa")).listener_name, "shout");
        }
    }

    #[test]
    fn test_composite_stores_only_present_slices() {
        let mut data = LastReceivedData::default();
        let composite = CompositeData {
            appearance: Some(AppearanceData {
                gag_slots: vec![GagSlot::default()],
            }),
            toybox: Some(ToyboxData::default()),
            ..Default::default()
        };

        let applied = merge_composite(&mut data, &composite, &Identity::new("me"));
        assert_eq!(applied, vec![DataKind::Appearance, DataKind::Toybox]);
        assert!(data.wardrobe.is_none());
        assert!(data.alias.is_none());
        assert!(data.updated_at.is_some());
    }

    #[test]
    fn test_empty_composite_touches_nothing() {
        let mut data = LastReceivedData::default();
        let applied = merge_composite(&mut data, &CompositeData::default(), &Identity::new("me"));
        assert!(applied.is_empty());
        assert_eq!(data, LastReceivedData::default());
    }

    #[test]
    fn test_partial_replaces_slice() {
        let mut data = LastReceivedData {
            shock_permissions: Some(ShockPermissions {
                allow_shocks: true,
                ..Default::default()
            }),
            ..Default::default()
        };

        let kind = merge_partial(&mut data, DataPayload::ShockPermissions(ShockPermissions::default()));
        assert_eq!(kind, DataKind::ShockPermissions);
        assert_eq!(data.shock_permissions, Some(ShockPermissions::default()));
    }

    #[test]
    fn test_registry_emits_informational_per_slice() {
        let registry = PairRegistry::with_defaults();
        let peer = Identity::new("peer1");
        registry.add_or_update(peer.clone(), RelationshipStatus::Bidirectional, Default::default());
        let mut rx = registry.subscribe();

        let mut alias_map = HashMap::new();
        alias_map.insert("someone-else".to_string(), alias_named("secret"));
        let composite = CompositeData {
            wardrobe: Some(Default::default()),
            alias_data_by_recipient: Some(alias_map),
            ..Default::default()
        };

        let applied = registry
            .receive_composite_data(&peer, &Identity::new("me"), &composite)
            .unwrap();
        assert_eq!(applied, vec![DataKind::Wardrobe, DataKind::Alias]);
        assert_eq!(registry.get(&peer).unwrap().data.alias, Some(AliasData::default()));

        let descriptions: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|n| match n {
                PairNotification::Informational { description, .. } => Some(description),
                _ => None,
            })
            .collect();
        assert_eq!(
            descriptions,
            vec!["Received Character Wardrobe Data", "Received Character Alias Data"]
        );
    }

    #[test]
    fn test_unknown_identity() {
        let registry = PairRegistry::with_defaults();
        let err = registry
            .receive_partial_data(&Identity::new("ghost"), DataPayload::Toybox(ToyboxData::default()))
            .unwrap_err();
        assert!(err.is_desync());
    }
}
