/// One accepted block-device read, attributed to the issuing executable.
#[derive(Debug, Clone)]
pub struct ReadEvent {
    pub comm: String,
    pub bytes: u64,
}
