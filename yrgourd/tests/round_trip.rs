//! End-to-end round trips: line echo, bulk transfer under constant
//! ratcheting, and full-duplex use over real sockets.

mod common;

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use common::pipe;
use rand_core::OsRng;
use yrgourd::{allow_all, initiate, respond, Config, KeyPair};

#[test]
fn line_echo_round_trip() {
    let rs = KeyPair::generate(&mut OsRng);
    let (client_pipe, server_pipe) = pipe();

    let server = thread::spawn({
        let rs_secret = rs.secret.clone();
        move || {
            let conn = respond(server_pipe, &rs_secret, None, allow_all).expect("respond");
            let mut conn = BufReader::new(conn);

            let mut line = String::new();
            conn.read_line(&mut line).expect("server read");
            assert_eq!(line, "this is the client!\n");

            conn.get_mut()
                .write_all(b"this is the server!\n")
                .expect("server write");
        }
    });

    let is = KeyPair::generate(&mut OsRng);
    let conn = initiate(client_pipe, &is.secret, &rs.public, None).expect("initiate");
    let mut conn = BufReader::new(conn);

    conn.get_mut()
        .write_all(b"this is the client!\n")
        .expect("client write");

    let mut line = String::new();
    conn.read_line(&mut line).expect("client read");
    assert_eq!(line, "this is the server!\n");

    server.join().unwrap();
}

#[test]
fn bulk_transfer_under_constant_ratcheting() {
    let rs = KeyPair::generate(&mut OsRng);
    let (client_pipe, server_pipe) = pipe();
    let config = Config {
        ratchet_after_bytes: 0,
        ratchet_after_time: Duration::ZERO,
    };

    let server = thread::spawn({
        let rs_secret = rs.secret.clone();
        move || {
            let mut conn =
                respond(server_pipe, &rs_secret, Some(config), allow_all).expect("respond");
            let message = [0u8; 1024];
            for _ in 0..100 {
                conn.write_all(&message).expect("server write");
            }
        }
    });

    let is = KeyPair::generate(&mut OsRng);
    let mut conn = initiate(client_pipe, &is.secret, &rs.public, None).expect("initiate");

    let mut read = Vec::new();
    conn.read_to_end(&mut read).expect("client read");
    assert_eq!(read.len(), 102_400);
    assert!(read.iter().all(|&b| b == 0));

    server.join().unwrap();
}

#[test]
fn both_directions_ratchet_on_every_write() {
    let rs = KeyPair::generate(&mut OsRng);
    let (client_pipe, server_pipe) = pipe();
    let config = Config {
        ratchet_after_bytes: 0,
        ratchet_after_time: Duration::ZERO,
    };

    let server = thread::spawn({
        let rs_secret = rs.secret.clone();
        move || {
            let mut conn =
                respond(server_pipe, &rs_secret, Some(config), allow_all).expect("respond");
            let mut buf = [0u8; 1024];
            for i in 0..100u8 {
                conn.read_exact(&mut buf).expect("server read");
                assert!(buf.iter().all(|&b| b == i));
                buf.fill(i.wrapping_add(1));
                conn.write_all(&buf).expect("server write");
            }
        }
    });

    let is = KeyPair::generate(&mut OsRng);
    let mut conn =
        initiate(client_pipe, &is.secret, &rs.public, Some(config)).expect("initiate");

    let mut buf = [0u8; 1024];
    for i in 0..100u8 {
        buf.fill(i);
        conn.write_all(&buf).expect("client write");
        conn.read_exact(&mut buf).expect("client read");
        assert!(buf.iter().all(|&b| b == i.wrapping_add(1)));
    }

    server.join().unwrap();
}

#[test]
fn tcp_split_full_duplex() {
    let rs = KeyPair::generate(&mut OsRng);
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let server = thread::spawn({
        let rs_secret = rs.secret.clone();
        move || {
            let (conn, _) = listener.accept().expect("accept");
            let conn = respond(conn, &rs_secret, None, allow_all).expect("respond");
            let (mut reader, mut writer) = conn.into_split().expect("split");
            // Echo until the client shuts its write side down.
            std::io::copy(&mut reader, &mut writer).expect("echo");
        }
    });

    let is = KeyPair::generate(&mut OsRng);
    let conn = TcpStream::connect(addr).expect("connect");
    let conn = initiate(conn, &is.secret, &rs.public, None).expect("initiate");
    let (mut reader, writer) = conn.into_split().expect("split");

    let writer_thread = thread::spawn(move || {
        let mut writer = writer;
        for i in 0..50u8 {
            writer.write_all(&vec![i; 512]).expect("client write");
        }
        writer
            .get_ref()
            .shutdown(Shutdown::Write)
            .expect("shutdown");
    });

    let mut read = vec![0u8; 50 * 512];
    reader.read_exact(&mut read).expect("client read");
    for (i, chunk) in read.chunks(512).enumerate() {
        assert!(chunk.iter().all(|&b| b == i as u8), "chunk {i}");
    }

    writer_thread.join().unwrap();
    server.join().unwrap();
}
