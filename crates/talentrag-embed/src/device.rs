use candle_core::Device;

/// Metal when built with the `metal` feature and a GPU answers, otherwise CPU.
/// `APP_EMBED_DEVICE=cpu` forces the CPU even on Metal builds.
pub fn select_device() -> Device {
    let force_cpu = std::env::var("APP_EMBED_DEVICE").is_ok_and(|v| v.eq_ignore_ascii_case("cpu"));
    #[cfg(feature = "metal")]
    {
        if !force_cpu {
            match Device::new_metal(0) {
                Ok(dev) => {
                    tracing::info!(device = "metal", "embedding device selected");
                    return dev;
                }
                Err(e) => tracing::warn!(error = %e, "metal unavailable, using CPU"),
            }
        }
    }
    tracing::info!(device = "cpu", forced = force_cpu, "embedding device selected");
    Device::Cpu
}
