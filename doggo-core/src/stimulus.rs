use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A discrete press coming from the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKey {
    Down,
    Left,
    Right,
}

impl ResponseKey {
    /// Parses an input identifier such as `"down"` or `"ArrowLeft"`.
    /// Unknown identifiers yield `None` and are meant to be ignored.
    pub fn parse(id: &str) -> Option<Self> {
        let id = id.trim().to_ascii_lowercase();
        let id = id.strip_prefix("arrow").unwrap_or(&id);
        match id {
            "down" => Some(ResponseKey::Down),
            "left" => Some(ResponseKey::Left),
            "right" => Some(ResponseKey::Right),
            _ => None,
        }
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            ResponseKey::Down => None,
            ResponseKey::Left => Some(Side::Left),
            ResponseKey::Right => Some(Side::Right),
        }
    }
}

impl From<Side> for ResponseKey {
    fn from(side: Side) -> Self {
        match side {
            Side::Left => ResponseKey::Left,
            Side::Right => ResponseKey::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Congruency {
    Congruent,
    Incongruent,
}

/// What gets shown when a trial's delay elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Stimulus {
    /// Baseline go signal, answered with the down key.
    Go,
    /// Spatial-compatibility stimulus: shown in `region`, answered by `direction`.
    Directional { region: Side, direction: Side },
}

impl Stimulus {
    pub fn required_key(&self) -> ResponseKey {
        match self {
            Stimulus::Go => ResponseKey::Down,
            Stimulus::Directional { direction, .. } => (*direction).into(),
        }
    }

    pub fn is_directional(&self) -> bool {
        matches!(self, Stimulus::Directional { .. })
    }

    pub fn region(&self) -> Option<Side> {
        match self {
            Stimulus::Go => None,
            Stimulus::Directional { region, .. } => Some(*region),
        }
    }

    pub fn direction(&self) -> Option<Side> {
        match self {
            Stimulus::Go => None,
            Stimulus::Directional { direction, .. } => Some(*direction),
        }
    }

    pub fn congruency(&self) -> Option<Congruency> {
        match self {
            Stimulus::Go => None,
            Stimulus::Directional { region, direction } if region == direction => {
                Some(Congruency::Congruent)
            }
            Stimulus::Directional { .. } => Some(Congruency::Incongruent),
        }
    }
}
