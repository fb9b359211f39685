/// Top-level screen the app shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootRoute {
    Splash,
    Onboarding,
    Auth,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainTab {
    Home,
    Explore,
    Create,
    Notifications,
    Profile,
}

impl MainTab {
    pub const ALL: [MainTab; 5] = [
        MainTab::Home,
        MainTab::Explore,
        MainTab::Create,
        MainTab::Notifications,
        MainTab::Profile,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            MainTab::Home => "Home",
            MainTab::Explore => "Explore",
            MainTab::Create => "Create",
            MainTab::Notifications => "Notifications",
            MainTab::Profile => "Profile",
        }
    }
}

/// Onboarding comes before sign-in; nothing past the splash shows until the
/// stored session has loaded.
pub fn root_route(loading: bool, onboarding_seen: bool, authenticated: bool) -> RootRoute {
    if loading {
        RootRoute::Splash
    } else if !onboarding_seen {
        RootRoute::Onboarding
    } else if !authenticated {
        RootRoute::Auth
    } else {
        RootRoute::Main
    }
}
