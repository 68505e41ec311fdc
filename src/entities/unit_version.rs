// 📊 UnitVersion - immutable snapshot of a unit's stats
//
// A changed stat never rewrites a stored version: the reconciler appends a
// new one, so the first entry of `Unit::versions` is always the current one.

use super::Audit;
use crate::compare::{Comparable, FieldDescriptor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitVersion {
    pub id: Option<i64>,
    pub unit_id: Option<i64>,

    // Costs
    pub gold: Option<i64>,
    pub green: Option<i64>,
    pub blue: Option<i64>,
    pub red: Option<i64>,
    pub energy: Option<i64>,

    // Stats
    pub attack: Option<i64>,
    pub health: Option<i64>,

    // Attributes
    pub supply: Option<i64>,
    pub unit_spell: Option<String>,
    pub frontline: Option<bool>,
    pub fragile: Option<bool>,
    pub blocker: Option<bool>,
    pub prompt: Option<bool>,
    pub stamina: Option<i64>,
    pub lifespan: Option<i64>,
    pub build_time: Option<i64>,
    pub exhaust_turn: Option<i64>,
    pub exhaust_ability: Option<i64>,
    pub position: Option<String>,
    pub abilities: Option<String>,

    pub audit: Audit,
}

static UNIT_VERSION_FIELDS: [FieldDescriptor<UnitVersion>; 22] = [
    FieldDescriptor { name: "id", get: |v| (&v.id).into(), excluded: true },
    FieldDescriptor { name: "unit_id", get: |v| (&v.unit_id).into(), excluded: true },
    FieldDescriptor { name: "gold", get: |v| (&v.gold).into(), excluded: false },
    FieldDescriptor { name: "green", get: |v| (&v.green).into(), excluded: false },
    FieldDescriptor { name: "blue", get: |v| (&v.blue).into(), excluded: false },
    FieldDescriptor { name: "red", get: |v| (&v.red).into(), excluded: false },
    FieldDescriptor { name: "energy", get: |v| (&v.energy).into(), excluded: false },
    FieldDescriptor { name: "attack", get: |v| (&v.attack).into(), excluded: false },
    FieldDescriptor { name: "health", get: |v| (&v.health).into(), excluded: false },
    FieldDescriptor { name: "supply", get: |v| (&v.supply).into(), excluded: false },
    FieldDescriptor { name: "unit_spell", get: |v| (&v.unit_spell).into(), excluded: false },
    FieldDescriptor { name: "frontline", get: |v| (&v.frontline).into(), excluded: false },
    FieldDescriptor { name: "fragile", get: |v| (&v.fragile).into(), excluded: false },
    FieldDescriptor { name: "blocker", get: |v| (&v.blocker).into(), excluded: false },
    FieldDescriptor { name: "prompt", get: |v| (&v.prompt).into(), excluded: false },
    FieldDescriptor { name: "stamina", get: |v| (&v.stamina).into(), excluded: false },
    FieldDescriptor { name: "lifespan", get: |v| (&v.lifespan).into(), excluded: false },
    FieldDescriptor { name: "build_time", get: |v| (&v.build_time).into(), excluded: false },
    FieldDescriptor { name: "exhaust_turn", get: |v| (&v.exhaust_turn).into(), excluded: false },
    FieldDescriptor {
        name: "exhaust_ability",
        get: |v| (&v.exhaust_ability).into(),
        excluded: false,
    },
    FieldDescriptor { name: "position", get: |v| (&v.position).into(), excluded: false },
    FieldDescriptor { name: "abilities", get: |v| (&v.abilities).into(), excluded: false },
];

impl Comparable for UnitVersion {
    const KIND: &'static str = "unit_versions";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &UNIT_VERSION_FIELDS
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }
}

impl UnitVersion {
    /// Copy of this version attached to another unit, ready to be inserted.
    pub fn reparented(&self, unit_id: i64) -> UnitVersion {
        UnitVersion {
            id: None,
            unit_id: Some(unit_id),
            audit: Audit::default(),
            ..self.clone()
        }
    }
}
