//! todo profile command implementations.

use crate::config::{Config, UserProfile};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};

use super::context::Globals;

pub struct SetOptions {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
}

fn profile_output(header: &str, profile: &UserProfile) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    let or_unset = |value: &str| {
        if value.is_empty() {
            "(unset)".to_string()
        } else {
            value.to_string()
        }
    };
    human.push_summary("Name", or_unset(&profile.name));
    human.push_summary("Email", or_unset(&profile.email));
    human.push_summary("Company", or_unset(&profile.company));
    human
}

pub fn run_show(globals: &Globals) -> Result<()> {
    let config = globals.load_config()?;
    let human = profile_output("Profile", &config.profile);
    emit_success(globals.output(), "profile show", &config.profile, Some(&human))
}

pub fn run_set(globals: &Globals, options: SetOptions) -> Result<()> {
    if options.name.is_none() && options.email.is_none() && options.company.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to set; pass --name, --email or --company".to_string(),
        ));
    }
    let path = globals.config_path().ok_or_else(|| {
        Error::InvalidConfig("no config file location; pass --config".to_string())
    })?;
    // Edit the file as stored so flag overrides are not persisted.
    let mut config = Config::load_or_default(Some(path.as_path()))?;
    if let Some(name) = options.name {
        config.profile.name = name.trim().to_string();
    }
    if let Some(email) = options.email {
        config.profile.email = email.trim().to_string();
    }
    if let Some(company) = options.company {
        config.profile.company = company.trim().to_string();
    }
    config.save(&path)?;

    let human = profile_output("Profile updated", &config.profile);
    emit_success(globals.output(), "profile set", &config.profile, Some(&human))
}
