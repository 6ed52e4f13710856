use chat_core::composer::Composer;
use chat_core::message::Side;
use chat_core::{Conversation, Message};
use leptos::ev;
use leptos::html;
use leptos::prelude::*;

use crate::api;
use crate::state::AppState;

/// Chat widget: the thread when signed in, otherwise the sign-in screen.
#[component]
pub fn Chat() -> impl IntoView {
    let state = expect_context::<AppState>();
    let conversation = state.conversation;

    view! {
        <Show
            when=move || conversation.with(Conversation::has_session)
            fallback=|| view! { <SignIn /> }
        >
            <ChatThread />
        </Show>
    }
}

#[component]
fn SignIn() -> impl IntoView {
    let on_click = move |_| {
        if let Err(e) = window().location().set_href(&api::sign_in_url("github")) {
            log::error!("Failed to start sign-in: {e:?}");
        }
    };

    view! {
        <div class="sign-in-screen">
            <div class="sign-in-card">
                <h2>"Please Sign In"</h2>
                <button class="sign-in-btn" on:click=on_click>
                    "Sign In with GitHub"
                </button>
            </div>
        </div>
    }
}

/// Message history, loading indicator, and input.
#[component]
fn ChatThread() -> impl IntoView {
    let state = expect_context::<AppState>();
    let conversation = state.conversation;
    let end_ref = NodeRef::<html::Div>::new();

    // Keep the newest message in view.
    Effect::new(move |_| {
        conversation.with(|c| c.messages().len());
        if let Some(end) = end_ref.get() {
            end.scroll_into_view();
        }
    });

    let on_sign_out = move |_| state.sign_out();

    view! {
        <main class="chat-area">
            // Error banner
            {move || {
                conversation
                    .with(|c| c.last_error().map(ToString::to_string))
                    .map(|err| {
                        view! {
                            <div
                                class="error-banner"
                                on:click=move |_| conversation.update(Conversation::dismiss_error)
                            >
                                {err}
                            </div>
                        }
                    })
            }}

            <div class="chat-header">
                <button class="sign-out-btn" on:click=on_sign_out>"Sign out"</button>
            </div>

            <div class="messages-container">
                {move || {
                    conversation.with(|c| {
                        c.messages()
                            .iter()
                            .cloned()
                            .map(|message| view! { <MessageBubble message=message /> })
                            .collect_view()
                    })
                }}
                <Show when=move || conversation.with(Conversation::is_loading)>
                    <div class="loading-indicator">
                        <div class="loading-dot"></div>
                    </div>
                </Show>
                <div node_ref=end_ref></div>
            </div>

            <ChatInput />
        </main>
    }
}

/// A single chat message bubble, placed by sender.
#[component]
fn MessageBubble(message: Message) -> impl IntoView {
    let css_class = match message.side() {
        Side::User => "message user",
        Side::Assistant => "message assistant",
    };

    view! {
        <div class=css_class>
            <div class="bubble">{message.text}</div>
        </div>
    }
}

/// Single-line input form; disabled while a reply is outstanding.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();
    let conversation = state.conversation;
    let composer = RwSignal::new(Composer::new());

    let is_loading = move || conversation.with(Conversation::is_loading);

    let on_submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let disabled = conversation.with_untracked(Conversation::is_loading);
        if let Some(text) = composer.try_update(|c| c.submit(disabled)).flatten() {
            state.send_message(text);
        }
    };

    view! {
        <form class="input-area" on:submit=on_submit>
            <input
                type="text"
                placeholder="Type your message..."
                prop:value=move || composer.with(|c| c.draft().to_string())
                on:input=move |ev| {
                    composer.update(|c| c.set_draft(event_target_value(&ev)));
                }
                disabled=is_loading
            />
            <button
                type="submit"
                class="send-btn"
                disabled=move || !composer.with(|c| c.can_submit(is_loading()))
            >
                "Send"
            </button>
        </form>
    }
}
