//! Scenes and profiles listing handlers

use crate::commands::{ProfilesArgs, ScenesArgs};
use crate::error::{CliError, CliResult};
use sdt_site::harness::Scene;
use sdt_site::{DeviceProfile, Roster};

/// Execute the scenes command
pub fn execute_scenes(args: &ScenesArgs) -> CliResult<()> {
    let roster = Roster::builtin()?;
    let scenes = list_scenes(&roster, args.profile.as_deref())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&scenes)?);
    } else {
        for scene in &scenes {
            println!("{:<16} {}", scene.name, scope(scene));
        }
    }
    Ok(())
}

/// Execute the profiles command
pub fn execute_profiles(args: &ProfilesArgs) -> CliResult<()> {
    let profiles = DeviceProfile::standard();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
    } else {
        for profile in &profiles {
            println!("{}", describe_profile(profile));
        }
    }
    Ok(())
}

/// Scenes captured at `profile`, or all scenes
pub fn list_scenes(roster: &Roster, profile: Option<&str>) -> CliResult<Vec<Scene>> {
    let scenes = Scene::all(roster);
    let Some(name) = profile else {
        return Ok(scenes);
    };
    let profile = DeviceProfile::named(name)
        .ok_or_else(|| CliError::invalid_argument(format!("unknown profile `{name}`")))?;
    let breakpoint = profile.breakpoint();
    Ok(scenes
        .into_iter()
        .filter(|s| s.applies_to(breakpoint))
        .collect())
}

/// Breakpoints a scene runs at, in words
#[must_use]
pub fn scope(scene: &Scene) -> String {
    match (scene.only, scene.skip) {
        (Some(only), _) => format!("{only} only"),
        (None, Some(skip)) => format!("all but {skip}"),
        (None, None) => "all breakpoints".to_string(),
    }
}

/// `phone  390x844 @2x  phone  mobile, touch`
#[must_use]
pub fn describe_profile(profile: &DeviceProfile) -> String {
    let mut flags = Vec::new();
    if profile.is_mobile {
        flags.push("mobile");
    }
    if profile.has_touch {
        flags.push("touch");
    }
    let size = format!(
        "{}x{} @{}x",
        profile.viewport.width, profile.viewport.height, profile.device_scale_factor
    );
    format!(
        "{:<8} {size:<14} {:<8} {}",
        profile.name,
        profile.breakpoint(),
        flags.join(", ")
    )
    .trim_end()
    .to_string()
}
