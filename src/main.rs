//! knockbot - an interactive knock-knock-joke character
//!
//! Holds a scripted conversation with a peer process over line-delimited
//! JSON and reacts with animated facial expressions on an abstract face
//! surface. Everything runs on one logical control thread.

mod conversation;
mod face;
mod orchestrator;
mod protocol;
mod sched;
#[cfg(test)]
mod testing;
mod text;

use face::{FaceDirector, FaceSurface, Pose};
use futures::{SinkExt, StreamExt};
use orchestrator::{Orchestrator, ReplySink};
use protocol::{PeerValue, ReplyFrame};
use sched::{Clock, ThreadRngRandom, TokioClock};
use std::net::SocketAddr;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BOUNCE_OFFSET_Y: f32 = 10.0;
const BOUNCE_PHASE: Duration = Duration::from_millis(200);

/// Reply sink that frames messages for the peer and performs the emphasis
/// bounce on the face surface.
struct PeerReplySink {
    outbound: mpsc::UnboundedSender<String>,
    surface: Weak<FaceSurface>,
    clock: Rc<dyn Clock>,
}

impl PeerReplySink {
    fn bounce(&self) {
        let Some(surface) = self.surface.upgrade() else {
            return;
        };
        surface.set_pose(Pose::shifted(0.0, BOUNCE_OFFSET_Y));
        let weak = Weak::clone(&self.surface);
        self.clock.after(
            BOUNCE_PHASE,
            Box::new(move || {
                if let Some(surface) = weak.upgrade() {
                    surface.set_pose(Pose::IDENTITY);
                }
            }),
        );
    }
}

impl ReplySink for PeerReplySink {
    fn reply(&self, message: &str, bounce: bool) {
        let frame = ReplyFrame {
            reply: message,
            bounce,
        };
        match serde_json::to_string(&frame) {
            Ok(line) => {
                if self.outbound.send(line).is_err() {
                    tracing::debug!("peer went away, reply dropped");
                }
            }
            Err(error) => tracing::error!(%error, "failed to encode reply frame"),
        }
        if bounce {
            self.bounce();
        }
    }
}

/// Drive one peer session to completion. The character's state (face,
/// conversation, joke patterns) lives for exactly one session.
async fn serve_peer(stream: TcpStream) -> Result<(), LinesCodecError> {
    let mut framed = Framed::new(stream, LinesCodec::new());
    let (outbound, mut replies) = mpsc::unbounded_channel::<String>();

    let surface = Rc::new(FaceSurface::new());
    let clock: Rc<dyn Clock> = Rc::new(TokioClock);
    let director = FaceDirector::new(
        Rc::clone(&surface),
        Rc::clone(&clock),
        Rc::new(ThreadRngRandom),
    );
    let sink = Rc::new(PeerReplySink {
        outbound,
        surface: Rc::downgrade(&surface),
        clock: Rc::clone(&clock),
    });
    let orchestrator = Orchestrator::new(
        director,
        Rc::clone(&sink) as Rc<dyn ReplySink>,
        Rc::clone(&clock),
    );

    loop {
        tokio::select! {
            line = framed.next() => match line {
                Some(Ok(line)) => match serde_json::from_str::<PeerValue>(&line) {
                    Ok(value) => orchestrator.receive(value),
                    Err(error) => {
                        tracing::warn!(%error, "undecodable peer line");
                        sink.reply("Hmm. I couldn't read that message.", false);
                    }
                },
                Some(Err(error)) => return Err(error),
                None => return Ok(()),
            },
            Some(line) = replies.recv() => {
                framed.send(line).await?;
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "knockbot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let port: u16 = std::env::var("KNOCKBOT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(9170);

    // Current-thread runtime with a LocalSet: the core types are Rc-based
    // and every deferred continuation must land back on this thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    runtime.block_on(local.run_until(async move {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("knockbot listening on {addr}");

        // One peer at a time; the character's attention is undivided.
        loop {
            let (stream, peer) = listener.accept().await?;
            tracing::info!(%peer, "peer connected");
            match serve_peer(stream).await {
                Ok(()) => tracing::info!(%peer, "peer disconnected"),
                Err(error) => tracing::warn!(%peer, %error, "peer session failed"),
            }
        }
    }))
}
