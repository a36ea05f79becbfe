use core::sync::atomic::{AtomicU32, Ordering};

use embassy_futures::join::join;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use maitake_sync::WaitMap;

/// A request/response rendezvous between two tasks.
///
/// Requests are tagged with a unique id so that multiple requests may be in
/// flight concurrently; the response for an id wakes exactly the task that
/// issued it.
pub struct ReqResp<Request, Response, const N: usize> {
    requests: Channel<CriticalSectionRawMutex, (u32, Request), N>,
    responses: WaitMap<u32, Response>,
    next_id: AtomicU32,
}

impl<Request, Response, const N: usize> ReqResp<Request, Response, N> {
    pub const fn new() -> Self {
        Self {
            requests: Channel::new(),
            responses: WaitMap::new(),
            next_id: AtomicU32::new(0),
        }
    }

    /// Send a request and wait for its response. Cancel-safe, though the
    /// request may not have been sent at the point of cancellation.
    pub async fn request(&self, request: Request) -> Response {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // The wait must be registered before the responder can see the
        // request, which join's polling order guarantees.
        let (response, ()) = join(self.responses.wait(id), self.requests.send((id, request))).await;

        response.expect("a response is only produced for a registered request id")
    }

    pub async fn wait_for_request(&self) -> (u32, Request) {
        self.requests.receive().await
    }

    pub fn respond(&self, id: u32, response: Response) {
        self.responses.wake(&id, response);
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::join::join_array;

    use super::*;

    #[futures_test::test]
    async fn echo_single() {
        const MAX_VAL: u32 = 1000;
        let channel = ReqResp::<_, _, 4>::new();

        let requester = async {
            for i in 0..=MAX_VAL {
                assert_eq!(channel.request(i).await, i);
            }
        };

        let responder = async {
            loop {
                let (id, request) = channel.wait_for_request().await;
                channel.respond(id, request);

                if request == MAX_VAL {
                    break;
                }
            }
        };

        join(requester, responder).await;
    }

    #[futures_test::test]
    async fn echo_concurrent() {
        let channel = ReqResp::<_, _, 4>::new();

        let requester = async {
            let results = join_array([
                channel.request(10u32),
                channel.request(11),
                channel.request(12),
                channel.request(13),
            ])
            .await;

            assert_eq!(results, [10, 11, 12, 13]);
        };

        let responder = async {
            for _ in 0..4 {
                let (id, request) = channel.wait_for_request().await;
                channel.respond(id, request);
            }
        };

        join(requester, responder).await;
    }
}
