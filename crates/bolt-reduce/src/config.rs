use bolt_runtime::{
    config::LaunchConfig,
    server::{DeviceProperties, LaunchError, ResourceLimitError},
    BoltError,
};

/// Shape of a tiled transform-reduce launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchSettings {
    /// Number of lanes per tile.
    pub tile_dim: u32,
    /// Number of tiles, each producing one partial result.
    pub tile_count: u32,
}

impl LaunchSettings {
    /// Picks the launch shape for `len` elements whose partial results take `elem_size` bytes.
    ///
    /// The tile width comes from the launch configuration or the device, and is halved until
    /// one partial result per lane fits in shared memory. The tile count never exceeds the
    /// number of full tiles in the input, so every tile has work, and is capped by the number
    /// of tiles the device keeps busy at once.
    pub fn generate(
        len: usize,
        elem_size: usize,
        properties: &DeviceProperties,
        config: &LaunchConfig,
    ) -> Result<Self, BoltError> {
        Self::new()
            .generate_tile_dim(elem_size, properties, config)?
            .generate_tile_count(len, properties, config)
    }

    fn new() -> Self {
        // Starting point, overwritten by the generators.
        Self {
            tile_dim: 1,
            tile_count: 1,
        }
    }

    fn generate_tile_dim(
        mut self,
        elem_size: usize,
        properties: &DeviceProperties,
        config: &LaunchConfig,
    ) -> Result<Self, BoltError> {
        let mut tile_dim = config.tile_dim.unwrap_or(properties.tile_dim);

        if !tile_dim.is_power_of_two() {
            return Err(BoltError::Configuration {
                reason: format!("tile width must be a power of two, got {tile_dim}"),
            });
        }

        while tile_dim > properties.max_tile_dim
            || tile_dim as usize * elem_size > properties.max_shared_memory_size
        {
            tile_dim /= 2;
        }

        if tile_dim == 0 {
            return Err(LaunchError::TooManyResources(ResourceLimitError::SharedMemory {
                requested: elem_size,
                max: properties.max_shared_memory_size,
            })
            .into());
        }

        self.tile_dim = tile_dim;
        Ok(self)
    }

    fn generate_tile_count(
        mut self,
        len: usize,
        properties: &DeviceProperties,
        config: &LaunchConfig,
    ) -> Result<Self, BoltError> {
        let compute_units = config.compute_units.unwrap_or(properties.compute_units).max(1);
        let max_tiles = compute_units.saturating_mul(config.tiles_per_compute_unit.max(1));
        let full_tiles = u32::try_from(len / self.tile_dim as usize).unwrap_or(u32::MAX);

        self.tile_count = full_tiles.clamp(1, max_tiles);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bolt_runtime::server::MemoryDeviceProperties;
    use pretty_assertions::assert_eq;

    fn properties() -> DeviceProperties {
        DeviceProperties::new(64, 256, 4, 1024, MemoryDeviceProperties::new(u64::MAX, 4))
    }

    #[test]
    fn small_inputs_use_one_tile() {
        let settings =
            LaunchSettings::generate(10, 4, &properties(), &LaunchConfig::default()).unwrap();

        assert_eq!(
            settings,
            LaunchSettings {
                tile_dim: 64,
                tile_count: 1
            }
        );
    }

    #[test]
    fn tile_count_is_capped_by_compute_units() {
        let config = LaunchConfig::default();

        let settings = LaunchSettings::generate(64 * 10, 4, &properties(), &config).unwrap();
        assert_eq!(settings.tile_count, 10);

        let settings = LaunchSettings::generate(1 << 20, 4, &properties(), &config).unwrap();
        assert_eq!(settings.tile_count, 4 * 8);
    }

    #[test]
    fn tile_dim_shrinks_to_fit_shared_memory() {
        // 64 lanes of 32 bytes need 2048 bytes of shared memory.
        let settings =
            LaunchSettings::generate(4096, 32, &properties(), &LaunchConfig::default()).unwrap();
        assert_eq!(settings.tile_dim, 32);

        let err = LaunchSettings::generate(4096, 2048, &properties(), &LaunchConfig::default());
        assert!(matches!(
            err,
            Err(BoltError::Launch(LaunchError::TooManyResources(_)))
        ));
    }

    #[test]
    fn launch_config_overrides_the_device() {
        let config = LaunchConfig {
            compute_units: Some(2),
            tiles_per_compute_unit: 1,
            tile_dim: Some(512),
        };

        let settings = LaunchSettings::generate(1 << 20, 1, &properties(), &config).unwrap();

        // Capped by the largest tile of the device.
        assert_eq!(
            settings,
            LaunchSettings {
                tile_dim: 256,
                tile_count: 2
            }
        );
    }
}
