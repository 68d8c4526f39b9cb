// src/handlers/ui.rs
use axum::{response::Html, routing::get, Router};

pub fn ui_routes() -> Router {
    Router::new()
        .route("/", get(app_page))
        .route("/app", get(app_page))
}

/// Single page with four views: chat, image insight, embed text, ask.
pub async fn app_page() -> Html<&'static str> {
    Html(APP_PAGE)
}

const APP_PAGE: &str = r###"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>🤖 LankaMate AI</title>
    <style>
        * { box-sizing: border-box; }
        body {
            margin: 0;
            font-family: Arial, sans-serif;
            background-color: #f4f4f4;
            color: #333;
            display: flex;
            min-height: 100vh;
        }
        .sidebar {
            width: 240px;
            background: #ffffff;
            padding: 20px;
            box-shadow: 0 2px 4px rgba(0, 0, 0, 0.1);
        }
        .sidebar h2 { color: #007bff; font-size: 22px; margin-top: 0; }
        .sidebar button {
            display: block;
            width: 100%;
            text-align: left;
            margin: 6px 0;
            padding: 10px 12px;
            border: none;
            border-radius: 5px;
            background: transparent;
            font-size: 15px;
            cursor: pointer;
        }
        .sidebar button.active { background: #007bff; color: white; }
        main { flex: 1; display: flex; flex-direction: column; align-items: center; }
        .view {
            display: none;
            width: 100%;
            max-width: 760px;
            background: white;
            margin: 30px;
            padding: 30px;
            border-radius: 10px;
            box-shadow: 0 4px 8px rgba(0, 0, 0, 0.1);
        }
        .view.active { display: block; }
        h1 { color: #007bff; font-size: 28px; }
        textarea, input[type=text] {
            width: 100%;
            padding: 10px;
            border: 1px solid #ccc;
            border-radius: 5px;
            font-size: 15px;
        }
        textarea { min-height: 120px; }
        .btn-custom {
            margin-top: 10px;
            background-color: #4CAF50;
            color: white;
            border-radius: 5px;
            padding: 10px 15px;
            border: none;
            cursor: pointer;
            font-size: 16px;
        }
        .btn-custom:hover { background-color: #45a049; }
        .btn-custom:disabled { background-color: #9e9e9e; cursor: wait; }
        .messages { max-height: 55vh; overflow-y: auto; margin-bottom: 15px; }
        .message { padding: 10px 14px; border-radius: 8px; margin: 8px 0; white-space: pre-wrap; }
        .message.user { background: #e3f2fd; }
        .message.assistant { background: #f1f8e9; }
        .message .role { font-size: 12px; color: #888; display: block; margin-bottom: 4px; }
        .chat-form { display: flex; gap: 8px; }
        .chat-form .btn-custom { margin-top: 0; }
        .columns { display: flex; gap: 20px; margin-top: 15px; }
        .columns > div { flex: 1; }
        .columns img { max-width: 100%; border-radius: 5px; }
        .info { background: #e8f4fd; color: #0c5460; padding: 12px; border-radius: 5px; }
        .warning { background: #fff3cd; color: #856404; padding: 12px; border-radius: 5px; margin-top: 15px; }
        .error { background: #f8d7da; color: #721c24; padding: 12px; border-radius: 5px; margin-top: 15px; }
        .result { margin-top: 15px; white-space: pre-wrap; word-break: break-word; }
        .footer { text-align: center; margin: 20px; font-size: 14px; color: #888; }
    </style>
</head>
<body>
    <nav class="sidebar">
        <h2>🤖 LankaMate AI</h2>
        <button data-view="chat" class="active">💬 ChatBot</button>
        <button data-view="image-insight">📷 Image Insight</button>
        <button data-view="embed-text">🔡 Embed Text</button>
        <button data-view="ask">❓ Ask me anything</button>
    </nav>

    <main>
        <section id="view-chat" class="view active">
            <h1>🤖 LankaMate AI ChatBot</h1>
            <div id="messages" class="messages"></div>
            <form id="chat-form" class="chat-form">
                <input type="text" id="chat-input" placeholder="Ask me anything..." autocomplete="off">
                <button type="submit" class="btn-custom">Send</button>
            </form>
            <div id="chat-status"></div>
        </section>

        <section id="view-image-insight" class="view">
            <h1>📷 Image Insight</h1>
            <input type="file" id="image-input" accept=".jpg,.jpeg,.png,image/jpeg,image/png">
            <br>
            <button id="caption-button" class="btn-custom">Generate Caption</button>
            <div id="caption-status"></div>
            <div class="columns">
                <div id="caption-preview"></div>
                <div id="caption-result"></div>
            </div>
        </section>

        <section id="view-embed-text" class="view">
            <h1>🔡 Embed Text</h1>
            <textarea id="embed-input" placeholder="Enter text to get embeddings..."></textarea>
            <button id="embed-button" class="btn-custom">Get Embeddings</button>
            <div id="embed-result" class="result"></div>
        </section>

        <section id="view-ask" class="view">
            <h1>❓ Ask me anything</h1>
            <textarea id="ask-input" placeholder="Ask me anything..."></textarea>
            <button id="ask-button" class="btn-custom">Get Response</button>
            <div id="ask-result" class="result"></div>
        </section>

        <div class="footer">Created with ❤️ by Nithilan</div>
    </main>

    <script>
        // The session lives as long as this browser tab.
        let sessionId = sessionStorage.getItem('lankamate-session');
        if (!sessionId) {
            sessionId = crypto.randomUUID();
            sessionStorage.setItem('lankamate-session', sessionId);
        }

        const el = (id) => document.getElementById(id);

        function showView(slug) {
            document.querySelectorAll('.sidebar button').forEach(b =>
                b.classList.toggle('active', b.dataset.view === slug));
            document.querySelectorAll('.view').forEach(v =>
                v.classList.toggle('active', v.id === 'view-' + slug));
            if (slug === 'chat') loadHistory();
        }
        document.querySelectorAll('.sidebar button').forEach(b =>
            b.addEventListener('click', () => showView(b.dataset.view)));

        function notice(target, kind, text) {
            target.innerHTML = '';
            if (!text) return;
            const div = document.createElement('div');
            div.className = kind;
            div.textContent = text;
            target.appendChild(div);
        }

        async function call(url, options) {
            const response = await fetch(url, options);
            const body = await response.json().catch(() => ({}));
            if (!response.ok) {
                throw new Error(body.message || ('Request failed with status ' + response.status));
            }
            return body;
        }

        function postJson(url, payload) {
            return call(url, {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(payload),
            });
        }

        async function busy(button, work) {
            button.disabled = true;
            try { await work(); } finally { button.disabled = false; }
        }

        function renderTurns(turns) {
            const box = el('messages');
            box.innerHTML = '';
            for (const turn of turns) {
                const role = turn.role === 'model' ? 'assistant' : turn.role;
                const div = document.createElement('div');
                div.className = 'message ' + role;
                const label = document.createElement('span');
                label.className = 'role';
                label.textContent = role;
                div.appendChild(label);
                div.appendChild(document.createTextNode(turn.content));
                box.appendChild(div);
            }
            box.scrollTop = box.scrollHeight;
        }

        async function loadHistory() {
            try {
                const body = await call('/api/chat/' + sessionId + '/history');
                renderTurns(body.turns);
            } catch (e) {
                notice(el('chat-status'), 'error', e.message);
            }
        }

        el('chat-form').addEventListener('submit', (event) => {
            event.preventDefault();
            const input = el('chat-input');
            const message = input.value;
            const button = event.target.querySelector('button');
            busy(button, async () => {
                notice(el('chat-status'), 'info', '');
                try {
                    const outcome = await postJson('/api/chat/' + sessionId, { message });
                    if (outcome.kind === 'reply') {
                        input.value = '';
                        renderTurns(outcome.turns);
                    }
                } catch (e) {
                    notice(el('chat-status'), 'error', e.message);
                }
            });
        });

        el('caption-button').addEventListener('click', (event) => {
            const file = el('image-input').files[0];
            const form = new FormData();
            if (file) form.append('image', file);
            busy(event.target, async () => {
                notice(el('caption-status'), 'info', '');
                el('caption-result').innerHTML = '';
                el('caption-preview').innerHTML = '';
                try {
                    const outcome = await call('/api/caption', { method: 'POST', body: form });
                    if (outcome.kind === 'warning') {
                        notice(el('caption-status'), 'warning', outcome.message);
                        return;
                    }
                    const img = document.createElement('img');
                    img.src = URL.createObjectURL(file);
                    el('caption-preview').appendChild(img);
                    notice(el('caption-result'), 'info', outcome.caption);
                } catch (e) {
                    notice(el('caption-status'), 'error', e.message);
                }
            });
        });

        el('embed-button').addEventListener('click', (event) => {
            busy(event.target, async () => {
                const target = el('embed-result');
                try {
                    const outcome = await postJson('/api/embed', { text: el('embed-input').value });
                    target.className = 'result';
                    target.textContent = outcome.dimensions + ' dimensions\n' + JSON.stringify(outcome.values);
                } catch (e) {
                    notice(target, 'error', e.message);
                }
            });
        });

        el('ask-button').addEventListener('click', (event) => {
            busy(event.target, async () => {
                const target = el('ask-result');
                try {
                    const outcome = await postJson('/api/ask', { prompt: el('ask-input').value });
                    target.className = 'result';
                    target.textContent = outcome.answer;
                } catch (e) {
                    notice(target, 'error', e.message);
                }
            });
        });

        loadHistory();
    </script>
</body>
</html>
"###;
