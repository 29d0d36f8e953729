// the html! macro failed to build without this
#![recursion_limit = "256"]

use std::rc::Rc;
use tracing::{debug, error, info, warn};
use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use yew::html::Scope;
use yew::prelude::*;

pub mod bootstrap;
pub mod endpoint;
pub mod render;
pub mod results;
pub mod search;
pub mod truncate;
pub mod websocket;

use render::DisplayRow;
use results::Results;

struct Model {
    page: Url,
    search: Rc<str>,
    results: Results,
    // Held so the socket and its callbacks live as long as the page.
    socket: Option<websocket::WebSocket>,
}

enum Msg {
    UpdateSearch {
        search: Rc<str>,
    },
    SearchResult {
        seq: u64,
        result: Result<jamroom_protocol::SearchResponse, search::SearchError>,
    },
    SocketOpen,
    SocketMessage {
        payload: Option<Vec<u8>>,
    },
    SocketError,
    SocketClose {
        code: u16,
        reason: String,
    },
}

fn connect(link: &Scope<Model>, page: &Url) -> Option<websocket::WebSocket> {
    let url = match endpoint::socket_url(page) {
        Ok(url) => url,
        Err(error) => {
            error!(message = "cannot build socket URL", %error);
            return None;
        }
    };
    let on_open = {
        let link = link.clone();
        move |_event: web_sys::Event| link.send_message(Msg::SocketOpen)
    };
    let on_error = {
        let link = link.clone();
        move |_event: web_sys::Event| link.send_message(Msg::SocketError)
    };
    let on_close = {
        let link = link.clone();
        move |event: web_sys::CloseEvent| {
            link.send_message(Msg::SocketClose {
                code: event.code(),
                reason: event.reason(),
            })
        }
    };
    let on_message = {
        let link = link.clone();
        move |event: web_sys::MessageEvent| {
            link.send_message(Msg::SocketMessage {
                payload: websocket::message_bytes(&event),
            })
        }
    };
    match websocket::WebSocket::new(url.as_str(), on_open, on_error, on_close, on_message) {
        Ok(socket) => Some(socket),
        Err(error) => {
            error!(message = "cannot open room socket", %error);
            None
        }
    }
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let page = endpoint::page_url().expect("browser gave us an unparseable page URL");
        let socket = connect(ctx.link(), &page);
        Self {
            page,
            search: Rc::from(""),
            results: Results::new(),
            socket,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::UpdateSearch { search: query } => {
                let url = match endpoint::search_url(&self.page, &query) {
                    Ok(url) => url,
                    Err(error) => {
                        error!(message = "cannot build search URL", %error);
                        return true;
                    }
                };
                self.search = query;
                let seq = self.results.begin();
                ctx.link().send_future(async move {
                    let result = search::fetch(url.as_str()).await;
                    Msg::SearchResult { seq, result }
                });
                true
            }

            Msg::SearchResult { seq, result } => match result {
                Err(error) => {
                    error!(message = "search failed", seq, %error);
                    false
                }
                Ok(response) => {
                    let applied = self.results.complete(seq, &response);
                    if !applied {
                        debug!(message = "dropping stale search result", seq);
                    }
                    applied
                }
            },

            Msg::SocketOpen => {
                info!(message = "room socket open");
                if let Some(socket) = &self.socket {
                    bootstrap::announce(socket, bootstrap::ROOM_NAME);
                }
                false
            }

            Msg::SocketMessage { payload } => {
                let result = match payload {
                    None => Err(bootstrap::DecodeError::UnsupportedFrame),
                    Some(bytes) => bootstrap::receive(&bytes),
                };
                if let Err(error) = result {
                    warn!(message = "bad room socket message", %error);
                }
                false
            }

            Msg::SocketError => {
                // No reconnect; the close event follows.
                error!(message = "room socket error");
                false
            }

            Msg::SocketClose { code, reason } => {
                warn!(message = "room socket closed", code, %reason);
                false
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let oninput = ctx.link().callback(|event: InputEvent| {
            let target = event.target().expect("oninput event must have target");
            let search: String = target.unchecked_into::<web_sys::HtmlInputElement>().value();
            Msg::UpdateSearch {
                search: Rc::from(search),
            }
        });
        html! {
            <>
                <div style="position: sticky; top: 0;">
                    <input
                        id="searchForm"
                        placeholder="Search"
                        value={yew::virtual_dom::AttrValue::from(self.search.clone())}
                        oninput={oninput}
                        style="width: 100%;"
                    />
                </div>
                <div id="searchList">
                    {for self.results.rows().iter().map(view_row)}
                </div>
            </>
        }
    }
}

fn view_row(row: &DisplayRow) -> Html {
    let thumbnail = match &row.thumbnail {
        Some(url) => html! { <img src={url.clone()} /> },
        None => html! {},
    };
    html! {
        <div class="row m-3" style="font-size: .9rem;">
            <div class="col-2">{thumbnail}</div>
            <div class="col-10">
                <div>{format!("Artist: {}", row.artists)}</div>
                <div>{format!("Song: {}", row.song)}</div>
                <div>{format!("Album: {}", row.album)}</div>
            </div>
        </div>
    }
}

#[wasm_bindgen(start)]
pub fn run_app() {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    tracing_wasm::set_as_global_default();

    yew::start_app::<Model>();
}
