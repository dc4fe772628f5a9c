use {
    crate::{Color, ScreenPoint},
    anyhow::{ensure, Context as _},
    x11rb::{
        connection::Connection,
        protocol::xproto::{ConnectionExt, ImageFormat, Window},
        rust_connection::RustConnection,
    },
};

/// Reads single pixels from the X root window.
pub struct PixelReader {
    connection: RustConnection,
    root: Window,
}

impl PixelReader {
    pub fn new() -> anyhow::Result<Self> {
        let (connection, screen_num) =
            x11rb::connect(None).context("failed to connect to the X server")?;
        let root = connection
            .setup()
            .roots
            .get(screen_num)
            .context("X server reported no screens")?
            .root;
        Ok(Self { connection, root })
    }

    pub fn read(&self, point: ScreenPoint) -> anyhow::Result<Color> {
        let x = i16::try_from(point.x).context("x coordinate is out of X11 range")?;
        let y = i16::try_from(point.y).context("y coordinate is out of X11 range")?;
        let reply = self
            .connection
            .get_image(ImageFormat::Z_PIXMAP, self.root, x, y, 1, 1, !0)?
            .reply()
            .with_context(|| format!("GetImage failed at {point}"))?;
        ensure!(
            reply.depth >= 24,
            "unsupported root window depth: {}",
            reply.depth
        );
        // 24 and 32 bit Z pixmaps are stored as BGRX.
        let [b, g, r] = reply
            .data
            .get(..3)
            .and_then(|bytes| <[u8; 3]>::try_from(bytes).ok())
            .context("GetImage returned no pixel data")?;
        Ok(Color::new(r, g, b))
    }
}

/// Input synthesis needs no extra permission under X11.
pub fn check_input_access() -> anyhow::Result<()> {
    Ok(())
}
