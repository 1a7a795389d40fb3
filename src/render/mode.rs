#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RenderMode {
    Indexed,
    Meshlet,
}

impl RenderMode {
    /// The mode after a toggle request. Without meshlet support the indexed
    /// path is the only choice.
    pub fn toggled(self, meshlets_supported: bool) -> Self {
        match self {
            RenderMode::Indexed if meshlets_supported => RenderMode::Meshlet,
            _ => RenderMode::Indexed,
        }
    }

    pub fn initial(requested: Option<RenderMode>, meshlets_supported: bool) -> Self {
        match requested {
            Some(RenderMode::Indexed) => RenderMode::Indexed,
            Some(RenderMode::Meshlet) if !meshlets_supported => {
                log::warn!("Meshlet rendering is not supported by the adapter, using indexed rendering");
                RenderMode::Indexed
            }
            _ if meshlets_supported => RenderMode::Meshlet,
            _ => RenderMode::Indexed,
        }
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderMode::Indexed => write!(f, "indexed"),
            RenderMode::Meshlet => write!(f, "meshlet"),
        }
    }
}
