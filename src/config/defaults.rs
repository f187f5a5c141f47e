//! Default configuration values

/// Build configuration file looked up in the current directory
pub const CONFIG_FILE: &str = "unibuild.toml";

/// Environment variable overriding the configuration path
pub const ENV_CONFIG: &str = "UNIBUILD_CONFIG";

/// Request sentinel selecting every registered component
pub const ALL_COMPONENTS: &str = "all";

/// `ARCH` value when more than one architecture is configured
pub const UNIVERSAL_ARCH: &str = "universal";

/// Suffix of in-flight downloads, renamed away on success
pub const DOWNLOAD_TEMP_SUFFIX: &str = ".temp";

/// Prefix of per-architecture temporary output directories
pub const ARCH_TEMP_PREFIX: &str = "unibuild";

/// Default working directory root (relative to the configuration)
pub const DEFAULT_WORK_DIR: &str = "work";

/// Default build output root (relative to the configuration)
pub const DEFAULT_BUILD_ROOT: &str = "build";

/// Default patches directory (relative to the configuration)
pub const DEFAULT_PATCHES_DIR: &str = "patches";

/// Default component descriptor directory (relative to the configuration)
pub const DEFAULT_COMPONENTS_DIR: &str = "components";

/// Default configure command
pub const DEFAULT_CONFIGURE_COMMAND: &str = "./configure";

/// Default build and install command
pub const DEFAULT_MAKE_COMMAND: &str = "make";

/// Tar binary used for unpacking
pub const TAR_TOOL: &str = "tar";

/// Patch binary used for the patch stage
pub const PATCH_TOOL: &str = "patch";

/// Shell used for the build stage
pub const SHELL: &str = "/bin/sh";
