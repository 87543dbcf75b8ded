/// Per-match statistics the backend reports and forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Metric {
    #[default]
    Kda,
    Kills,
    Deaths,
    Assists,
    DamageDealt,
    DamageTaken,
    GoldEarned,
    CreepScore,
    DamagePerMinute,
    GoldPerMinute,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::Kda,
        Metric::Kills,
        Metric::Deaths,
        Metric::Assists,
        Metric::DamageDealt,
        Metric::DamageTaken,
        Metric::GoldEarned,
        Metric::CreepScore,
        Metric::DamagePerMinute,
        Metric::GoldPerMinute,
    ];

    /// Wire key used in match records and the predictions map. Case-sensitive.
    pub fn key(self) -> &'static str {
        match self {
            Metric::Kda => "KDA",
            Metric::Kills => "kills",
            Metric::Deaths => "deaths",
            Metric::Assists => "assists",
            Metric::DamageDealt => "damage_dealt",
            Metric::DamageTaken => "damage_taken",
            Metric::GoldEarned => "gold_earned",
            Metric::CreepScore => "creep_score",
            Metric::DamagePerMinute => "damage_per_minute",
            Metric::GoldPerMinute => "gold_per_minute",
        }
    }

    pub fn from_key(key: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.key() == key)
    }

    /// Display-only form.
    pub fn label(self) -> String {
        self.key().to_uppercase()
    }

    pub fn next(self) -> Metric {
        let idx = self.position();
        Metric::ALL[(idx + 1) % Metric::ALL.len()]
    }

    pub fn prev(self) -> Metric {
        let idx = self.position();
        Metric::ALL[(idx + Metric::ALL.len() - 1) % Metric::ALL.len()]
    }

    pub fn position(self) -> usize {
        Metric::ALL
            .iter()
            .position(|m| *m == self)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_and_are_case_sensitive() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_key(metric.key()), Some(metric));
        }
        assert_eq!(Metric::from_key("kda"), None);
        assert_eq!(Metric::from_key("Kills"), None);
        assert_eq!(Metric::from_key(""), None);
    }

    #[test]
    fn labels_are_uppercased_keys() {
        assert_eq!(Metric::Kda.label(), "KDA");
        assert_eq!(Metric::GoldPerMinute.label(), "GOLD_PER_MINUTE");
    }

    #[test]
    fn cycling_wraps_around() {
        assert_eq!(Metric::GoldPerMinute.next(), Metric::Kda);
        assert_eq!(Metric::Kda.prev(), Metric::GoldPerMinute);
        assert_eq!(Metric::Kills.next(), Metric::Deaths);
    }
}
