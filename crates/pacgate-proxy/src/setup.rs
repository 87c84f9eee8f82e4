//! Cross-platform automatic proxy configuration.
//!
//! Points the operating system at a PAC file URL, or turns automatic proxy
//! configuration off again:
//! - Windows: `AutoConfigURL` under the user's Internet Settings key
//! - macOS: `networksetup -setautoproxyurl` on the active network service
//! - Linux: GNOME `org.gnome.system.proxy` mode `auto`

use std::path::Path;
#[cfg(any(target_os = "macos", target_os = "linux"))]
use std::process::Command;

/// Result of a setup operation.
#[derive(Debug, Clone)]
pub struct SetupResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
    /// Whether admin/root privileges are required.
    pub needs_admin: bool,
}

impl SetupResult {
    fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            needs_admin: false,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            needs_admin: false,
        }
    }

    #[allow(dead_code)]
    fn needs_admin(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            needs_admin: true,
        }
    }
}

/// `file://` URL for a PAC file on disk.
pub fn pac_file_url(path: &Path) -> String {
    let display = path.display().to_string();
    if cfg!(windows) {
        format!("file:///{}", display.replace('\\', "/"))
    } else {
        format!("file://{}", display)
    }
}

// ============================================================================
// Automatic Proxy Configuration
// ============================================================================

/// Enables automatic proxy configuration from `pac_url`.
pub fn enable_pac_url(pac_url: &str) -> SetupResult {
    #[cfg(target_os = "windows")]
    {
        enable_pac_windows(pac_url)
    }

    #[cfg(target_os = "macos")]
    {
        enable_pac_macos(pac_url)
    }

    #[cfg(target_os = "linux")]
    {
        enable_pac_linux(pac_url)
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        let _ = pac_url;
        SetupResult::failure("Unsupported operating system")
    }
}

/// Disables automatic proxy configuration.
pub fn disable_system_proxy() -> SetupResult {
    #[cfg(target_os = "windows")]
    {
        disable_pac_windows()
    }

    #[cfg(target_os = "macos")]
    {
        disable_pac_macos()
    }

    #[cfg(target_os = "linux")]
    {
        disable_pac_linux()
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        SetupResult::failure("Unsupported operating system")
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(target_os = "windows")]
const INTERNET_SETTINGS_PATH: &str = r"Software\Microsoft\Windows\CurrentVersion\Internet Settings";

#[cfg(target_os = "windows")]
const AUTO_CONFIG_URL: &str = "AutoConfigURL";

#[cfg(target_os = "windows")]
fn enable_pac_windows(pac_url: &str) -> SetupResult {
    use winreg::enums::*;
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let key = match hkcu.create_subkey(INTERNET_SETTINGS_PATH) {
        Ok((key, _)) => key,
        Err(e) => return SetupResult::failure(format!("Failed to open Internet Settings: {}", e)),
    };

    match key.set_value(AUTO_CONFIG_URL, &pac_url) {
        Ok(()) => SetupResult::success(format!("Automatic proxy configuration set: {}", pac_url)),
        Err(e) => SetupResult::failure(format!("Failed to set AutoConfigURL: {}", e)),
    }
}

#[cfg(target_os = "windows")]
fn disable_pac_windows() -> SetupResult {
    use winreg::enums::*;
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let key = match hkcu.open_subkey_with_flags(INTERNET_SETTINGS_PATH, KEY_WRITE) {
        Ok(key) => key,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return SetupResult::success("Automatic proxy configuration already off")
        }
        Err(e) => return SetupResult::failure(format!("Failed to open Internet Settings: {}", e)),
    };

    match key.delete_value(AUTO_CONFIG_URL) {
        Ok(()) => SetupResult::success("Automatic proxy configuration disabled"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            SetupResult::success("Automatic proxy configuration already off")
        }
        Err(e) => SetupResult::failure(format!("Failed to remove AutoConfigURL: {}", e)),
    }
}

// ============================================================================
// macOS Implementation
// ============================================================================

#[cfg(target_os = "macos")]
fn get_active_network_service() -> Option<String> {
    let output = Command::new("networksetup")
        .args(["-listallnetworkservices"])
        .output()
        .ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);

    for service in ["Wi-Fi", "Ethernet", "USB 10/100/1000 LAN"] {
        if stdout.contains(service) {
            return Some(service.to_string());
        }
    }

    // First enabled service; disabled ones are prefixed with '*'
    stdout
        .lines()
        .skip(1)
        .find(|line| !line.starts_with('*'))
        .map(|s| s.to_string())
}

#[cfg(target_os = "macos")]
fn enable_pac_macos(pac_url: &str) -> SetupResult {
    let service = match get_active_network_service() {
        Some(s) => s,
        None => return SetupResult::failure("Could not find active network service"),
    };

    let url_result = Command::new("networksetup")
        .args(["-setautoproxyurl", &service, pac_url])
        .output();
    let state_result = Command::new("networksetup")
        .args(["-setautoproxystate", &service, "on"])
        .output();

    match (url_result, state_result) {
        (Ok(u), Ok(s)) if u.status.success() && s.status.success() => SetupResult::success(
            format!("Automatic proxy configuration enabled on {}", service),
        ),
        (Err(e), _) | (_, Err(e)) => {
            SetupResult::failure(format!("Failed to run networksetup: {}", e))
        }
        _ => SetupResult::needs_admin(
            "Failed to set automatic proxy. May need administrator privileges.",
        ),
    }
}

#[cfg(target_os = "macos")]
fn disable_pac_macos() -> SetupResult {
    let service = match get_active_network_service() {
        Some(s) => s,
        None => return SetupResult::failure("Could not find active network service"),
    };

    match Command::new("networksetup")
        .args(["-setautoproxystate", &service, "off"])
        .output()
    {
        Ok(out) if out.status.success() => {
            SetupResult::success("Automatic proxy configuration disabled")
        }
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            SetupResult::failure(format!("Failed to disable automatic proxy: {}", stderr))
        }
        Err(e) => SetupResult::failure(format!("Failed to run networksetup: {}", e)),
    }
}

// ============================================================================
// Linux Implementation
// ============================================================================

#[cfg(target_os = "linux")]
fn gsettings(args: &[&str]) -> std::result::Result<String, String> {
    match Command::new("gsettings").args(args).output() {
        Ok(out) if out.status.success() => Ok(String::from_utf8_lossy(&out.stdout).into_owned()),
        Ok(out) => Err(String::from_utf8_lossy(&out.stderr).trim().to_string()),
        Err(e) => Err(format!("Failed to run gsettings: {}", e)),
    }
}

#[cfg(target_os = "linux")]
fn enable_pac_linux(pac_url: &str) -> SetupResult {
    // URL first so the mode switch never activates a stale script
    if let Err(e) = gsettings(&["set", "org.gnome.system.proxy", "autoconfig-url", pac_url]) {
        return SetupResult::failure(format!("Failed to set GNOME autoconfig URL: {}", e));
    }
    if let Err(e) = gsettings(&["set", "org.gnome.system.proxy", "mode", "auto"]) {
        return SetupResult::failure(format!("Failed to enable GNOME automatic proxy: {}", e));
    }

    SetupResult::success(format!("GNOME automatic proxy configured: {}", pac_url))
}

#[cfg(target_os = "linux")]
fn disable_pac_linux() -> SetupResult {
    match gsettings(&["set", "org.gnome.system.proxy", "mode", "none"]) {
        Ok(_) => SetupResult::success("GNOME proxy disabled"),
        Err(e) => SetupResult::failure(format!("Failed to disable GNOME proxy: {}", e)),
    }
}

// ============================================================================
// Tests
// ============================================================================
