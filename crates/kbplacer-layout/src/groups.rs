//! Staging of keys that share a rotation.
//!
//! Keys are buffered per open group and only receive the group's rotation when
//! the group closes, so a group's angle or pivot may still change after its
//! first members were read. A key is staged into its layout-editor cluster and
//! into the innermost open named group; the cluster rotation is applied first.

use kbplacer_core::Point;
use tracing::debug;

use crate::model::{Key, Rotation};

#[derive(Debug, Clone, PartialEq)]
enum GroupId {
    Cluster(usize),
    Named(String),
}

#[derive(Debug)]
struct OpenGroup {
    id: GroupId,
    angle: f64,
    pivot: Option<Point>,
    members: Vec<usize>,
}

impl OpenGroup {
    fn close(self, keys: &mut [Key]) {
        debug!(group = ?self.id, members = self.members.len(), angle = self.angle, "closing rotation group");
        if self.angle == 0.0 {
            return;
        }
        let rotation = Rotation {
            angle: self.angle,
            pivot: self.pivot,
        };
        for idx in self.members {
            let key = &mut keys[idx];
            match self.id {
                // The cluster rotation is the innermost one, whichever group closes first.
                GroupId::Cluster(_) => key.rotations.insert(0, rotation),
                GroupId::Named(_) => key.rotations.push(rotation),
            }
        }
    }
}

/// Cluster identity as seen by the parser state: angle and pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ClusterState {
    pub angle: f64,
    pub pivot: Point,
}

#[derive(Debug, Default)]
pub(crate) struct RotationStaging {
    cluster: Option<(ClusterState, OpenGroup)>,
    named: Vec<OpenGroup>,
    clusters_opened: usize,
}

impl RotationStaging {
    /// Record `keys[idx]` as a member of the current cluster and innermost named group.
    pub fn stage(&mut self, idx: usize, cluster: ClusterState, keys: &mut [Key]) {
        let same = matches!(&self.cluster, Some((state, _)) if *state == cluster);
        if !same {
            if let Some((_, group)) = self.cluster.take() {
                group.close(keys);
            }
            let id = GroupId::Cluster(self.clusters_opened);
            self.clusters_opened += 1;
            self.cluster = Some((
                cluster,
                OpenGroup {
                    id,
                    angle: cluster.angle,
                    pivot: Some(cluster.pivot),
                    members: Vec::new(),
                },
            ));
        }
        if let Some((_, group)) = self.cluster.as_mut() {
            group.members.push(idx);
        }
        if let Some(group) = self.named.last_mut() {
            group.members.push(idx);
        }
    }

    /// Open a named group turning about `origin` until `grx`/`gry` move it,
    /// so its members rotate as one block.
    pub fn open_named(&mut self, name: &str, origin: Point) {
        debug!(group = name, depth = self.named.len() + 1, "opening rotation group");
        self.named.push(OpenGroup {
            id: GroupId::Named(name.to_string()),
            angle: 0.0,
            pivot: Some(origin),
            members: Vec::new(),
        });
    }

    /// Update the innermost named group; returns `false` when none is open.
    pub fn update_named(&mut self, angle: Option<f64>, px: Option<f64>, py: Option<f64>) -> bool {
        let Some(group) = self.named.last_mut() else {
            return false;
        };
        if let Some(a) = angle {
            group.angle = a;
        }
        if px.is_some() || py.is_some() {
            let current = group.pivot.unwrap_or(Point::ORIGIN);
            group.pivot = Some(Point::new(
                px.unwrap_or(current.x),
                py.unwrap_or(current.y),
            ));
        }
        true
    }

    /// Close the innermost named group; returns `false` when none is open.
    pub fn close_named(&mut self, keys: &mut [Key]) -> bool {
        match self.named.pop() {
            Some(group) => {
                group.close(keys);
                true
            }
            None => false,
        }
    }

    pub fn close_all(&mut self, keys: &mut [Key]) {
        if let Some((_, group)) = self.cluster.take() {
            group.close(keys);
        }
        while let Some(group) = self.named.pop() {
            group.close(keys);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: usize) -> Vec<Key> {
        (0..n).map(|i| Key::new(i, i as f64, 0.0)).collect()
    }

    fn cluster(angle: f64) -> ClusterState {
        ClusterState {
            angle,
            pivot: Point::ORIGIN,
        }
    }

    #[test]
    fn named_group_rotation_applies_to_earlier_members() {
        let mut ks = keys(3);
        let mut staging = RotationStaging::default();
        staging.open_named("thumb", Point::ORIGIN);
        staging.stage(0, cluster(0.0), &mut ks);
        staging.stage(1, cluster(0.0), &mut ks);
        assert!(staging.update_named(Some(15.0), Some(1.0), Some(2.0)));
        assert!(staging.close_named(&mut ks));
        staging.stage(2, cluster(0.0), &mut ks);
        staging.close_all(&mut ks);

        for k in &ks[..2] {
            assert_eq!(
                k.rotations,
                vec![Rotation {
                    angle: 15.0,
                    pivot: Some(Point::new(1.0, 2.0))
                }]
            );
        }
        assert!(ks[2].rotations.is_empty());
    }

    #[test]
    fn innermost_named_group_wins() {
        let mut ks = keys(2);
        let mut staging = RotationStaging::default();
        staging.open_named("outer", Point::ORIGIN);
        staging.update_named(Some(10.0), None, None);
        staging.stage(0, cluster(0.0), &mut ks);
        staging.open_named("inner", Point::ORIGIN);
        staging.update_named(Some(-20.0), None, None);
        staging.stage(1, cluster(0.0), &mut ks);
        staging.close_all(&mut ks);

        assert_eq!(ks[0].rotations.len(), 1);
        assert_eq!(ks[0].rotations[0].angle, 10.0);
        assert_eq!(ks[1].rotations.len(), 1);
        assert_eq!(ks[1].rotations[0].angle, -20.0);
    }

    #[test]
    fn cluster_rotation_stays_innermost() {
        let mut ks = keys(1);
        let mut staging = RotationStaging::default();
        staging.open_named("g", Point::ORIGIN);
        staging.update_named(Some(5.0), None, None);
        staging.stage(0, cluster(30.0), &mut ks);
        // named group closes before the cluster does
        staging.close_named(&mut ks);
        staging.close_all(&mut ks);
        let angles: Vec<f64> = ks[0].rotations.iter().map(|r| r.angle).collect();
        assert_eq!(angles, vec![30.0, 5.0]);
    }

    #[test]
    fn named_group_pivot_defaults_to_its_origin() {
        let mut ks = keys(2);
        let mut staging = RotationStaging::default();
        staging.open_named("thumb", Point::new(3.0, 4.0));
        staging.stage(0, cluster(0.0), &mut ks);
        staging.update_named(Some(12.0), None, Some(5.0));
        staging.stage(1, cluster(0.0), &mut ks);
        staging.close_all(&mut ks);
        for k in &ks {
            assert_eq!(k.rotations[0].pivot, Some(Point::new(3.0, 5.0)));
        }
    }

    #[test]
    fn updates_without_open_group_are_rejected() {
        let mut ks = keys(0);
        let mut staging = RotationStaging::default();
        assert!(!staging.update_named(Some(1.0), None, None));
        assert!(!staging.close_named(&mut ks));
    }
}
