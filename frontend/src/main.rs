mod api;
mod components;
mod state;

use leptos::mount::mount_to_body;
use leptos::prelude::*;

use components::chat::Chat;
use state::AppState;

/// Root application component.
#[component]
fn App() -> impl IntoView {
    let state = AppState::provide();

    // Session changes drive history loads; the listener goes away with the app.
    let listener = state.clone();
    let subscription = state
        .hub
        .subscribe(move |session| listener.on_session(session.cloned()));
    on_cleanup(move || subscription.unsubscribe());

    state.restore_session();

    view! { <Chat /> }
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
