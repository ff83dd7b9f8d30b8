// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use crate::model::{ArrangementStyle, BusConfig, BusKind, MASTER_BUS_ID};

use super::profiles::MixProfile;
use super::roles::{BusFamily, RoleBinding};

/// Effect send added to every voice bus of a full arrangement.
const FULL_ARRANGEMENT_SEND: &str = "reverb-send";

/// Builds one bus per role family in use, in order of first use, followed by the master bus.
pub fn build_buses(
    roles: &[RoleBinding],
    mix: MixProfile,
    arrangement: ArrangementStyle,
) -> Vec<BusConfig> {
    let mut families: Vec<BusFamily> = Vec::new();
    for binding in roles {
        if !families.contains(&binding.family) {
            families.push(binding.family);
        }
    }

    let mut buses: Vec<BusConfig> = families
        .into_iter()
        .map(|family| {
            let mut bus_mix = mix.bus_mix(family);
            if arrangement == ArrangementStyle::Full
                && !bus_mix.effects.iter().any(|e| e == FULL_ARRANGEMENT_SEND)
            {
                bus_mix.effects.push(FULL_ARRANGEMENT_SEND.to_string());
            }
            BusConfig {
                id: family.bus_id().to_string(),
                name: family.bus_name().to_string(),
                kind: BusKind::Voice,
                gain: bus_mix.gain,
                pan: bus_mix.pan,
                muted: bus_mix.muted,
                solo: bus_mix.solo,
                effects: bus_mix.effects,
            }
        })
        .collect();

    buses.push(master_bus());
    buses
}

/// The fixed master bus.
pub fn master_bus() -> BusConfig {
    BusConfig {
        id: MASTER_BUS_ID.to_string(),
        name: "Master".to_string(),
        kind: BusKind::Master,
        gain: 1.0,
        pan: 0.0,
        muted: false,
        solo: false,
        effects: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Song;
    use crate::projection::roles::resolve_roles;

    #[test]
    fn test_one_bus_per_family_plus_master() {
        let song = Song::new("song", 120.0);
        let roles = resolve_roles(&song, ArrangementStyle::Standard);
        let buses = build_buses(&roles, MixProfile::Balanced, ArrangementStyle::Standard);

        let ids: Vec<&str> = buses.iter().map(|bus| bus.id.as_str()).collect();
        assert_eq!(ids, vec!["bus-default", "bus-bass", "bus-drums", "master"]);
        assert_eq!(buses.last().map(|bus| bus.kind), Some(BusKind::Master));
        assert!(buses.iter().all(|bus| bus.effects.is_empty()));
    }

    #[test]
    fn test_full_arrangement_adds_sends() {
        let song = Song::new("song", 120.0);
        let roles = resolve_roles(&song, ArrangementStyle::Full);
        let buses = build_buses(&roles, MixProfile::DrumForward, ArrangementStyle::Full);
        for bus in buses.iter().filter(|bus| bus.kind == BusKind::Voice) {
            assert_eq!(bus.effects, vec![FULL_ARRANGEMENT_SEND]);
        }
        assert!(buses[buses.len() - 1].effects.is_empty());
    }
}
