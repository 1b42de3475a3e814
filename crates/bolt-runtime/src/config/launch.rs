use crate::BoltError;

/// Shape of accelerator launches.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LaunchConfig {
    /// Overrides the number of compute units reported by the device.
    #[serde(default)]
    pub compute_units: Option<u32>,

    /// Number of tiles launched per compute unit.
    #[serde(default = "default_tiles_per_compute_unit")]
    pub tiles_per_compute_unit: u32,

    /// Overrides the number of lanes per tile. Must be a power of two.
    #[serde(default)]
    pub tile_dim: Option<u32>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            compute_units: None,
            tiles_per_compute_unit: default_tiles_per_compute_unit(),
            tile_dim: None,
        }
    }
}

fn default_tiles_per_compute_unit() -> u32 {
    8
}

impl LaunchConfig {
    /// Checks that the values can form a launch.
    pub fn validate(&self) -> Result<(), BoltError> {
        if let Some(tile_dim) = self.tile_dim {
            if !tile_dim.is_power_of_two() {
                return Err(BoltError::configuration(format!(
                    "tile width must be a power of two, got {tile_dim}"
                )));
            }
        }

        if self.compute_units == Some(0) {
            return Err(BoltError::configuration("compute units must be positive"));
        }

        if self.tiles_per_compute_unit == 0 {
            return Err(BoltError::configuration(
                "tiles per compute unit must be positive",
            ));
        }

        Ok(())
    }
}

/// Host thread pool configuration.
#[derive(Default, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MultiCoreConfig {
    /// Size of a dedicated pool. The global `rayon` pool is used when unset.
    #[serde(default)]
    pub num_threads: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_dim_must_be_power_of_two() {
        let mut config = LaunchConfig::default();
        assert_eq!(config.validate(), Ok(()));

        config.tile_dim = Some(48);
        assert!(matches!(
            config.validate(),
            Err(BoltError::Configuration { .. })
        ));

        config.tile_dim = Some(32);
        config.tiles_per_compute_unit = 0;
        assert!(config.validate().is_err());
    }
}
