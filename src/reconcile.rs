//! Create/update/conflict resolution for one propagation level.

use crate::error::{InheritError, InheritResult};
use crate::index::EntityIndex;
use crate::types::Entity;

/// Decide, for every (source, target container) pair, how the source is
/// mirrored onto the target.
///
/// Each returned record copies the source's non-identifier fields, with
/// `container_id` set to the target and `origin_id` pointing back at the
/// source. Records carrying an `id` update an existing mirror in place; the
/// rest are creates. A target entity matched by name wins over one matched
/// by origin, and a name match whose origin is set to a *different* source
/// aborts the whole batch with [`InheritError::NameConflict`].
///
/// Sources are walked in input order and targets in ascending container id,
/// so the first conflict reported is deterministic.
pub fn reconcile(sources: &[Entity], index: &EntityIndex) -> InheritResult<Vec<Entity>> {
    let target_ids = index.container_ids();
    let mut records = Vec::with_capacity(sources.len() * target_ids.len());

    for source in sources {
        let source_id = source.id.ok_or_else(|| InheritError::UnsavedSource {
            name: source.name.clone(),
        })?;

        for &target_id in &target_ids {
            let Some(target) = index.container(target_id) else {
                continue;
            };

            let mut existing = target.by_origin.get(&source_id);

            if let Some(by_name) = target.by_name.get(&source.name) {
                match by_name.origin_id {
                    Some(origin_id) if origin_id != source_id => {
                        return Err(InheritError::NameConflict {
                            name: by_name.name.clone(),
                            container_id: target_id,
                        });
                    }
                    _ => existing = Some(by_name),
                }
            }

            let mut record = source.clone();
            record.container_id = target_id;
            record.origin_id = Some(source_id);
            record.id = existing.and_then(|e| e.id);
            records.push(record);
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContainerId, EntityId};

    fn saved(id: EntityId, name: &str, container_id: ContainerId, origin_id: Option<EntityId>) -> Entity {
        Entity {
            id: Some(id),
            origin_id,
            ..Entity::new(name, container_id)
        }
    }

    #[test]
    fn test_create_when_target_empty() {
        let index = EntityIndex::build(&[2], vec![]);
        let records = reconcile(&[saved(7, "CPU", 1, None)], &index).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, None);
        assert_eq!(records[0].container_id, 2);
        assert_eq!(records[0].origin_id, Some(7));
        assert_eq!(records[0].name, "CPU");
    }

    #[test]
    fn test_update_matched_by_origin() {
        let index = EntityIndex::build(&[2], vec![saved(30, "CPU load", 2, Some(7))]);
        let records = reconcile(&[saved(7, "CPU", 1, None)], &index).unwrap();

        // Renamed at the source, matched through the origin link.
        assert_eq!(records[0].id, Some(30));
        assert_eq!(records[0].name, "CPU");
    }

    #[test]
    fn test_adopts_directly_authored_by_name() {
        let index = EntityIndex::build(&[2], vec![saved(30, "CPU", 2, None)]);
        let records = reconcile(&[saved(7, "CPU", 1, None)], &index).unwrap();

        assert_eq!(records[0].id, Some(30));
        assert_eq!(records[0].origin_id, Some(7));
    }

    #[test]
    fn test_name_match_wins_over_origin_match() {
        let index = EntityIndex::build(
            &[2],
            vec![saved(30, "CPU load", 2, Some(7)), saved(31, "CPU", 2, Some(7))],
        );
        let records = reconcile(&[saved(7, "CPU", 1, None)], &index).unwrap();

        assert_eq!(records[0].id, Some(31));
    }

    #[test]
    fn test_conflict_with_different_origin() {
        let index = EntityIndex::build(&[2], vec![saved(30, "CPU", 2, Some(5))]);
        let err = reconcile(&[saved(7, "CPU", 1, None)], &index).unwrap_err();

        match err {
            InheritError::NameConflict { name, container_id } => {
                assert_eq!(name, "CPU");
                assert_eq!(container_id, 2);
            }
            other => panic!("expected NameConflict, got {other:?}"),
        }
    }

    #[test]
    fn test_unsaved_source_rejected() {
        let index = EntityIndex::build(&[2], vec![]);
        let err = reconcile(&[Entity::new("CPU", 1)], &index).unwrap_err();
        assert!(matches!(err, InheritError::UnsavedSource { .. }));
    }

    #[test]
    fn test_cross_product_covers_every_pair() {
        let index = EntityIndex::build(&[2, 3, 4], vec![]);
        let sources = vec![saved(7, "CPU", 1, None), saved(8, "Memory", 1, None)];
        let records = reconcile(&sources, &index).unwrap();
        assert_eq!(records.len(), 6);
    }

    #[test]
    fn test_empty_index_yields_no_records() {
        let index = EntityIndex::build(&[], vec![]);
        let records = reconcile(&[saved(7, "CPU", 1, None)], &index).unwrap();
        assert!(records.is_empty());
    }
}
