#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use age::secrecy::SecretString;
use base64::Engine;
use ed25519_dalek::SigningKey;

use gpgmail::keys::bundle::fingerprint_from_keys;
use gpgmail::keys::store::KeyStore;
use gpgmail::keys::Fingerprint;

pub struct TestKey {
    pub identity: age::x25519::Identity,
    pub signing: SigningKey,
    pub fingerprint: Fingerprint,
}

/// Write a public bundle and a passphrase-protected signing key into `store`.
pub fn add_key(store: &KeyStore, name: &str, uid: &str, seed: u8, passphrase: &str) -> TestKey {
    std::fs::create_dir_all(store.public_dir()).unwrap();
    std::fs::create_dir_all(store.secret_dir()).unwrap();

    let identity = age::x25519::Identity::generate();
    let signing = SigningKey::from_bytes(&[seed; 32]);
    let age_pub = identity.to_public().to_string();
    let sign_pub =
        base64::engine::general_purpose::STANDARD.encode(signing.verifying_key().to_bytes());
    std::fs::write(
        store.public_dir().join(format!("{}.pub", name)),
        format!(
            "# gpgmail public key\nuid: {}\nage: {}\nsign: ed25519:{}\n",
            uid, age_pub, sign_pub
        ),
    )
    .unwrap();

    let fingerprint = fingerprint_from_keys(&age_pub, &sign_pub);
    write_secret(
        &store.secret_key_path(&fingerprint),
        &base64::engine::general_purpose::STANDARD.encode(signing.to_bytes()),
        passphrase,
    );

    TestKey {
        identity,
        signing,
        fingerprint,
    }
}

fn write_secret(path: &Path, seed_b64: &str, passphrase: &str) {
    let mut recipient = age::scrypt::Recipient::new(SecretString::from(passphrase.to_string()));
    recipient.set_work_factor(10);
    let encryptor =
        age::Encryptor::with_recipients(std::iter::once(&recipient as &dyn age::Recipient))
            .unwrap();
    let mut out = vec![];
    let mut writer = encryptor.wrap_output(&mut out).unwrap();
    writer.write_all(seed_b64.as_bytes()).unwrap();
    writer.finish().unwrap();
    std::fs::write(path, out).unwrap();
}

/// Decrypt an armored age message (anything after the ciphertext is ignored).
pub fn decrypt(envelope: &[u8], identity: &age::x25519::Identity) -> Vec<u8> {
    use std::io::Read;

    let text = String::from_utf8_lossy(envelope);
    let end = "-----END AGE ENCRYPTED FILE-----";
    let cut = text.find(end).map(|i| i + end.len()).unwrap_or(text.len());
    let armored = format!("{}\n", &text[..cut]);

    let decryptor =
        age::Decryptor::new(age::armor::ArmoredReader::new(armored.as_bytes())).unwrap();
    let mut reader = decryptor
        .decrypt(std::iter::once(identity as &dyn age::Identity))
        .unwrap();
    let mut plaintext = vec![];
    reader.read_to_end(&mut plaintext).unwrap();
    plaintext
}

/// A scripted SMTP server on a background thread. Each step is (expected
/// command prefix, reply); the prefix `.` reads a DATA body up to the
/// terminator line. Returns the port and a handle yielding every line read.
pub fn smtp_server(
    script: Vec<(&'static str, &'static str)>,
) -> (u16, std::thread::JoinHandle<Vec<String>>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = std::thread::spawn(move || {
        let (socket, _) = listener.accept().unwrap();
        socket
            .set_read_timeout(Some(std::time::Duration::from_secs(20)))
            .unwrap();
        let mut reader = std::io::BufReader::new(socket.try_clone().unwrap());
        let mut writer = socket;
        let mut transcript = Vec::new();

        writer.write_all(b"220 mx.test ESMTP\r\n").unwrap();
        for (expect, reply) in script {
            if expect == "." {
                loop {
                    let line = read_line(&mut reader);
                    let done = line == ".";
                    transcript.push(line);
                    if done {
                        break;
                    }
                }
            } else {
                let line = read_line(&mut reader);
                assert!(line.starts_with(expect), "expected {expect:?}, got {line:?}");
                transcript.push(line);
            }
            writer.write_all(reply.as_bytes()).unwrap();
        }
        transcript
    });

    (port, handle)
}

fn read_line(reader: &mut std::io::BufReader<std::net::TcpStream>) -> String {
    use std::io::BufRead;

    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    line.trim_end_matches(['\r', '\n']).to_string()
}

/// The DATA body from a server transcript: the lines after the outer header
/// block, up to the terminator.
pub fn delivered_body(transcript: &[String]) -> String {
    let start = transcript
        .iter()
        .position(|l| l == "DATA")
        .expect("no DATA command");
    let lines: Vec<&str> = transcript[start + 1..]
        .iter()
        .map(String::as_str)
        .skip_while(|l| !l.is_empty())
        .skip(1)
        .take_while(|l| *l != ".")
        .collect();
    lines.join("\n")
}
