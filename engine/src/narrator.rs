//! The external narrative generation capability.
//!
//! The engine only depends on the `(request) -> text | failure` contract.
//! Calls are bounded by a timeout; on failure or timeout the turn resolver
//! substitutes the deterministic fallback text, so gameplay never dead-ends
//! on generator trouble.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Which template produced the prompt. The fallback keys off this too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Arrival,
    Turn,
    EndingStay,
    EndingQuit,
}

/// One generation request. `timeout` bounds the call; the session must never
/// block indefinitely on the generator.
#[derive(Debug, Clone)]
pub struct NarrativeRequest {
    pub kind: PromptKind,
    pub prompt: String,
    pub timeout: Duration,
}

/// Text-generation capability consumed as a black box.
pub trait Narrator: Send + Sync {
    fn generate(&self, request: &NarrativeRequest) -> Result<String>;
}

/// Run a generation with the request's timeout enforced. The generator call
/// runs on its own thread; on timeout the result is abandoned and the caller
/// falls back.
pub fn generate_bounded(narrator: Arc<dyn Narrator>, request: NarrativeRequest) -> Result<String> {
    let timeout = request.timeout;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(narrator.generate(&request));
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => bail!("narrative generation timed out after {timeout:?}"),
    }
}

/// Deterministic offline narrator. Doubles as the fallback content source and
/// as the default generator when no external capability is wired up.
#[derive(Debug, Default)]
pub struct FallbackNarrator;

impl Narrator for FallbackNarrator {
    fn generate(&self, request: &NarrativeRequest) -> Result<String> {
        Ok(fallback_text(request.kind).to_string())
    }
}

/// Canned response per prompt kind. Turn and arrival texts carry the full
/// hidden-tag structure with all-zero deltas and a generic choice set, so
/// they parse like any narrator output.
pub fn fallback_text(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Arrival => {
            "\
You stumble forward, catching yourself against rough stone. The air hits you first - woodsmoke, animals, something cooking. Your ears ring from the transition.

When your vision clears, you see a narrow street of packed earth. People in unfamiliar clothes stop to stare at yours. Somewhere nearby, a hammer rings against metal.

Your device hangs cool and dormant against your chest. Your three items are hidden beneath your clothing. You need shelter before dark, and you need to learn when and where you are.

[A] Head toward the sound of voices - you need information
[B] Find somewhere quiet to observe before anyone questions you
[C] Approach the nearest workshop - honest work might earn trust

<anchors>belonging[0] legacy[0] freedom[0]</anchors>"
        }
        PromptKind::Turn => {
            "\
Your choice sets events in motion. The day unfolds with consequences you only partly foresee.

People are beginning to know your face now. Some nod in recognition. Others still eye you with suspicion. This place is becoming familiar, for better or worse.

[A] Press forward with your current path
[B] Seek out someone you've met before
[C] Take time to observe and plan

<anchors>belonging[0] legacy[0] freedom[0]</anchors>"
        }
        PromptKind::EndingStay => {
            "\
The decision settles over you like the first warmth of spring after a long winter. This is where you belong now.

You look around at the familiar streets, the faces you've come to know, the life you've built here piece by piece. The device feels lighter somehow, as if it too understands that your journey has found its destination.

Years pass. You build a home, not just of walls and roof, but of memories and relationships. Your strange knowledge from another time becomes local wisdom, passed down to those who need it.

The traveler's journey ends not with a return, but with an arrival."
        }
        PromptKind::EndingQuit => {
            "\
Some journeys end before the destination is found. You set down the device, its glow fading to nothing.

The weight of all the eras you've passed through settles on your shoulders. You carry fragments of each - memories of faces, echoes of choices made and unmade.

Perhaps another traveler will find the path you couldn't. Your story here is over, but stories have a way of continuing in unexpected ways."
        }
    }
}
